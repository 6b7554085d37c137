mod calc;
mod model;
mod pdf;
mod repo;
mod stats;
mod store;
mod workflow;

use chrono::Local;
use clap::{Parser, Subcommand};
use comfy_table::{Attribute, Cell, Color, Table};
use directories::{BaseDirs, ProjectDirs};
use inquire::{Confirm, Select, Text};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::calc::{calculate_system_metrics, format_currency, format_number};
use crate::model::{PersonalDetails, Project, ProjectStatus, SystemConfiguration};
use crate::repo::{ProjectPatch, Repository};
use crate::store::JsonFileStore;
use crate::workflow::{QuotationDraft, Step, validate_system_config};

// ==========================================
// Structs & Enums
// ==========================================

#[derive(Debug, Serialize, Deserialize)]
struct AppConfig {
    data_root: String,
}

#[derive(Parser)]
#[command(name = "solar-quote")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new quotation (3-step wizard)
    New,
    /// List all projects
    List,
    /// Show one project in full
    Show { id: String },
    /// Edit a project's system configuration (re-prices it)
    Edit { id: String },
    /// Mark a project as completed
    Complete { id: String },
    /// Revert a project to draft
    Reopen { id: String },
    /// Attach image references to a project
    Attach { id: String, paths: Vec<String> },
    /// Delete a project
    Delete { id: String },
    /// Income / capacity totals and the 6-month breakdown
    Dashboard,
    /// Export all projects as pretty-printed JSON
    Export,
    /// Generate a quotation PDF for one project
    Pdf { id: String },
    /// Update default GST percentage and base price
    Settings,
    /// Configure data directory
    Config,
    /// Wipe all projects and settings
    Reset,
}

// ==========================================
// Main Function
// ==========================================

fn main() {
    let cli = Cli::parse();

    // `config` reconfigures the data root itself, so it must run before the
    // eager config load below (which would trigger the same wizard twice on
    // a first run).
    if matches!(cli.command, Some(Commands::Config)) {
        setup_config_wizard();
        return;
    }

    // 1. Initialize configuration
    let config = load_app_config().unwrap_or_else(setup_config_wizard);
    let expanded_path = expand_home_dir(&config.data_root);
    let root = PathBuf::from(expanded_path);

    if let Err(e) = fs::create_dir_all(root.join("data")) {
        eprintln!("❌ Error: Failed to create data directory: {}", e);
        return;
    }

    let store = JsonFileStore::new(root.join("data"));
    let mut repo = match Repository::load(Box::new(store)) {
        Ok(repo) => repo,
        Err(e) => {
            eprintln!("❌ Error: Failed to load project data: {}", e);
            return;
        }
    };

    if cli.command.is_none() {
        use clap::CommandFactory;
        Cli::command().print_help().unwrap();
        return;
    }

    match cli.command.unwrap() {
        Commands::New => {
            run_quotation_wizard(&mut repo);
        }
        Commands::List => {
            list_projects(&repo);
        }
        Commands::Show { id } => {
            show_project(&repo, &id);
        }
        Commands::Edit { id } => {
            edit_project_wizard(&mut repo, &id);
        }
        Commands::Complete { id } => {
            change_status(&mut repo, &id, ProjectStatus::Completed);
        }
        Commands::Reopen { id } => {
            change_status(&mut repo, &id, ProjectStatus::Draft);
        }
        Commands::Attach { id, paths } => {
            if paths.is_empty() {
                println!("❌ No image paths given.");
                return;
            }
            match repo.append_images(&id, paths) {
                Ok(()) => println!("✅ Images attached."),
                Err(e) => println!("❌ {}", e),
            }
        }
        Commands::Delete { id } => {
            delete_project(&mut repo, &id);
        }
        Commands::Dashboard => {
            show_dashboard(&repo);
        }
        Commands::Export => {
            export_projects(&repo, &root);
        }
        Commands::Pdf { id } => match repo.get_project(&id) {
            Some(project) => pdf::generate_quotation_pdf(&root, project),
            None => println!("❌ Project '{}' not found.", id),
        },
        Commands::Settings => {
            settings_wizard(&mut repo);
        }
        Commands::Config => {} // handled before the config load above
        Commands::Reset => {
            reset_wizard(&mut repo);
        }
    }
}

// ==========================================
// 1. Quotation Wizard (3 steps)
// ==========================================

fn run_quotation_wizard(repo: &mut Repository) {
    println!("\n--- New Quotation ---");
    let mut draft = QuotationDraft::new();

    loop {
        match draft.step() {
            Step::PersonalDetails => {
                let details = prompt_personal_details(draft.personal_details());
                if let Err(errors) = draft.submit_personal_details(details) {
                    for e in errors {
                        println!("❌ {}", e);
                    }
                }
            }
            Step::SystemConfig => {
                let continue_opt = "System configuration";
                let back_opt = "⬅ Back to personal details";
                let choice = Select::new("Next step:", vec![continue_opt, back_opt])
                    .prompt()
                    .unwrap_or(back_opt);
                if choice == back_opt {
                    draft.back();
                    continue;
                }

                let config = prompt_system_config(repo, draft.system_configuration());
                // Non-authoritative preview, shown before the step is submitted
                if validate_system_config(&config).is_empty() {
                    print_calculations_table(&config);
                }
                if let Err(errors) = draft.submit_system_configuration(config) {
                    for e in errors {
                        println!("❌ {}", e);
                    }
                }
            }
            Step::Review => {
                println!("\n--- Review & Generate ---");
                if let Some(details) = draft.personal_details() {
                    println!("👤 {} · {} · {}", details.name, details.phone, details.email);
                    println!("📍 {}", details.address);
                }
                if let Some(config) = draft.system_configuration() {
                    print_calculations_table(config);
                }

                let commit_opt = "✅ Create quotation";
                let back_opt = "⬅ Back to system configuration";
                let cancel_opt = "❌ Cancel";
                let choice = Select::new("Finish:", vec![commit_opt, back_opt, cancel_opt])
                    .prompt()
                    .unwrap_or(cancel_opt);

                if choice == back_opt {
                    draft.back();
                    continue;
                }
                if choice == cancel_opt {
                    println!("Cancelled. Nothing was saved.");
                    return;
                }

                match draft.commit(repo) {
                    Ok(id) => println!("✅ Quotation created: {}", id),
                    Err(e) => println!("❌ {}", e),
                }
                return;
            }
        }
    }
}

fn prompt_personal_details(previous: Option<&PersonalDetails>) -> PersonalDetails {
    println!("\n--- Step 1: Personal Details ---");
    let name = Text::new("Client Name:")
        .with_default(previous.map(|d| d.name.as_str()).unwrap_or(""))
        .prompt()
        .unwrap_or_default();
    let phone = Text::new("Phone:")
        .with_default(previous.map(|d| d.phone.as_str()).unwrap_or(""))
        .prompt()
        .unwrap_or_default();
    let email = Text::new("Email:")
        .with_default(previous.map(|d| d.email.as_str()).unwrap_or(""))
        .prompt()
        .unwrap_or_default();
    let address = Text::new("Address:")
        .with_default(previous.map(|d| d.address.as_str()).unwrap_or(""))
        .prompt()
        .unwrap_or_default();
    PersonalDetails {
        name,
        phone,
        email,
        address,
    }
}

fn prompt_system_config(
    repo: &Repository,
    previous: Option<&SystemConfiguration>,
) -> SystemConfiguration {
    println!("\n--- Step 2: System Configuration ---");
    let settings = repo.settings();
    let default_price = previous
        .map(|c| c.base_price_per_kw)
        .unwrap_or(settings.default_base_price_per_kw);
    let default_gst = previous
        .map(|c| c.gst_percentage)
        .unwrap_or(settings.default_gst_percentage);

    let make = Text::new("Panel Make:")
        .with_default(previous.map(|c| c.make.as_str()).unwrap_or(""))
        .prompt()
        .unwrap_or_default();
    let watt_peak = prompt_f64("Watt Peak per panel (W):", previous.map(|c| c.watt_peak));
    let panels_default = previous
        .map(|c| c.number_of_panels.to_string())
        .unwrap_or_default();
    let number_of_panels = Text::new("Number of Panels:")
        .with_default(&panels_default)
        .prompt()
        .unwrap_or_default()
        .trim()
        .parse::<u32>()
        .unwrap_or(0);
    let base_price_per_kw = prompt_f64("Base Price per kW (₹):", Some(default_price));
    let gst_percentage = prompt_f64("GST %:", Some(default_gst));
    let cleaning_charges = prompt_f64(
        "Cleaning Charges (₹):",
        Some(previous.map(|c| c.cleaning_charges).unwrap_or(0.0)),
    );
    let subsidy = prompt_f64(
        "Subsidy (₹):",
        Some(previous.map(|c| c.subsidy).unwrap_or(0.0)),
    );

    SystemConfiguration {
        make,
        watt_peak,
        number_of_panels,
        base_price_per_kw,
        gst_percentage,
        cleaning_charges,
        subsidy,
    }
}

// NaN on parse failure so validation rejects it instead of silently zeroing
fn prompt_f64(message: &str, default: Option<f64>) -> f64 {
    let mut prompt = Text::new(message);
    let default_str = default.map(format_plain);
    if let Some(d) = &default_str {
        prompt = prompt.with_default(d);
    }
    prompt
        .prompt()
        .unwrap_or_default()
        .trim()
        .parse::<f64>()
        .unwrap_or(f64::NAN)
}

fn format_plain(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{:.0}", v)
    } else {
        format!("{}", v)
    }
}

// ==========================================
// 2. Project Views & Edits
// ==========================================

fn list_projects(repo: &Repository) {
    let mut projects: Vec<&Project> = repo.projects().iter().collect();
    if projects.is_empty() {
        println!("(No projects yet — run `solar-quote new`)");
        return;
    }
    projects.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let mut table = Table::new();
    table.set_header(vec![
        Cell::new("ID"),
        Cell::new("Client"),
        Cell::new("Size (kW)"),
        Cell::new("Payable"),
        Cell::new("Status"),
        Cell::new("Created"),
    ]);
    for p in projects {
        let status_cell = if p.status == ProjectStatus::Completed {
            Cell::new("completed").fg(Color::Rgb { r: 4, g: 120, b: 87 })
        } else {
            Cell::new("draft")
        };
        table.add_row(vec![
            Cell::new(&p.id),
            Cell::new(&p.personal_details.name),
            Cell::new(format_number(p.calculations.system_size)),
            Cell::new(format_currency(p.calculations.total_payable_amount)),
            status_cell,
            Cell::new(p.created_at.format("%d %b %Y").to_string()),
        ]);
    }
    println!("{table}");
}

fn show_project(repo: &Repository, id: &str) {
    let Some(p) = repo.get_project(id) else {
        println!("❌ Project '{}' not found.", id);
        return;
    };

    println!("\n--- Project {} ({}) ---", p.id, p.status);
    println!(
        "👤 {} · {} · {}",
        p.personal_details.name, p.personal_details.phone, p.personal_details.email
    );
    println!("📍 {}", p.personal_details.address);
    println!(
        "🔆 {} × {} W ({})",
        p.system_configuration.number_of_panels,
        format_number(p.system_configuration.watt_peak),
        p.system_configuration.make
    );
    print_calculations_table(&p.system_configuration);
    if p.images.is_empty() {
        println!("🖼  No images attached.");
    } else {
        println!("🖼  Images:");
        for image in &p.images {
            println!("   - {}", image);
        }
    }
    println!(
        "Created {} · Updated {}",
        p.created_at.format("%d %b %Y %H:%M"),
        p.updated_at.format("%d %b %Y %H:%M")
    );
}

fn print_calculations_table(config: &SystemConfiguration) {
    let calc = calculate_system_metrics(config);
    let mut table = Table::new();
    table.add_row(vec![
        Cell::new("System Size"),
        Cell::new(format!("{} kW", format_number(calc.system_size))),
    ]);
    table.add_row(vec![
        Cell::new(format!(
            "Base Price ({} / kW)",
            format_currency(config.base_price_per_kw)
        )),
        Cell::new(format_currency(calc.total_base_price)),
    ]);
    table.add_row(vec![
        Cell::new(format!("GST ({}%)", config.gst_percentage)),
        Cell::new(format_currency(calc.gst_amount)),
    ]);
    table.add_row(vec![
        Cell::new("Cleaning Charges"),
        Cell::new(format_currency(config.cleaning_charges)),
    ]);
    table.add_row(vec![
        Cell::new("Subsidy"),
        Cell::new(format!("- {}", format_currency(config.subsidy))),
    ]);
    table.add_row(vec![
        Cell::new("Total Payable").add_attribute(Attribute::Bold),
        Cell::new(format_currency(calc.total_payable_amount)).add_attribute(Attribute::Bold),
    ]);
    println!("{table}");
}

fn edit_project_wizard(repo: &mut Repository, id: &str) {
    let Some(project) = repo.get_project(id) else {
        println!("❌ Project '{}' not found.", id);
        return;
    };
    let current = project.system_configuration.clone();

    println!("\n--- Edit System Configuration ({}) ---", id);
    let config = prompt_system_config(repo, Some(&current));
    let errors = validate_system_config(&config);
    if !errors.is_empty() {
        for e in errors {
            println!("❌ {}", e);
        }
        println!("❌ Nothing saved.");
        return;
    }

    print_calculations_table(&config);
    let save = Confirm::new("Save these changes?")
        .with_default(true)
        .prompt()
        .unwrap_or(false);
    if !save {
        println!("Cancelled. Nothing was saved.");
        return;
    }

    let patch = ProjectPatch {
        system_configuration: Some(config),
        ..ProjectPatch::default()
    };
    match repo.update_project(id, patch) {
        Ok(()) => println!("✅ Project updated and re-priced."),
        Err(e) => println!("❌ {}", e),
    }
}

fn change_status(repo: &mut Repository, id: &str, status: ProjectStatus) {
    let patch = ProjectPatch {
        status: Some(status),
        ..ProjectPatch::default()
    };
    match repo.update_project(id, patch) {
        Ok(()) => println!("✅ Project {} marked as {}.", id, status),
        Err(e) => println!("❌ {}", e),
    }
}

fn delete_project(repo: &mut Repository, id: &str) {
    if repo.get_project(id).is_none() {
        println!("❌ Project '{}' not found.", id);
        return;
    }
    let confirmed = Confirm::new(&format!("Delete project {}? This cannot be undone.", id))
        .with_default(false)
        .prompt()
        .unwrap_or(false);
    if !confirmed {
        println!("Cancelled.");
        return;
    }
    match repo.delete_project(id) {
        Ok(()) => println!("✅ Project deleted."),
        Err(e) => println!("❌ {}", e),
    }
}

// ==========================================
// 3. Dashboard
// ==========================================

fn show_dashboard(repo: &Repository) {
    let stats = repo.dashboard_stats();

    let mut totals = Table::new();
    totals.set_header(vec![
        Cell::new("Total Income"),
        Cell::new("Total kW Installed"),
        Cell::new("Projects"),
    ]);
    totals.add_row(vec![
        Cell::new(format_currency(stats.total_income)).add_attribute(Attribute::Bold),
        Cell::new(format!("{} kW", format_number(stats.total_kw_installed)))
            .add_attribute(Attribute::Bold),
        Cell::new(stats.total_projects.to_string()).add_attribute(Attribute::Bold),
    ]);
    println!("\n--- Dashboard ---");
    println!("{totals}");

    let mut monthly = Table::new();
    monthly.set_header(vec![
        Cell::new("Month"),
        Cell::new("Income"),
        Cell::new("Projects"),
    ]);
    for entry in &stats.monthly_data {
        let income_cell = if entry.income > 0.0 {
            Cell::new(format_currency(entry.income)).fg(Color::Rgb { r: 4, g: 120, b: 87 })
        } else {
            Cell::new(format_currency(entry.income))
        };
        monthly.add_row(vec![
            Cell::new(&entry.month),
            income_cell,
            Cell::new(entry.projects.to_string()),
        ]);
    }
    println!("{monthly}");
}

// ==========================================
// 4. Export
// ==========================================

fn export_projects(repo: &Repository, root: &Path) {
    let bytes = match repo.export_json() {
        Ok(bytes) => bytes,
        Err(e) => {
            println!("❌ Export failed: {}", e);
            return;
        }
    };
    let filename = format!("solar_projects_{}.json", Local::now().format("%Y-%m-%d"));
    let path = root.join(&filename);
    match fs::write(&path, bytes) {
        Ok(()) => println!(
            "✅ Exported {} project(s) to {:?}",
            repo.projects().len(),
            path
        ),
        Err(e) => println!("❌ Export failed: {}", e),
    }
}

// ==========================================
// 5. Settings & Reset
// ==========================================

fn settings_wizard(repo: &mut Repository) {
    println!("\n--- Settings ---");
    let current = repo.settings().clone();

    let gst = prompt_f64(
        "Default GST % for new quotations:",
        Some(current.default_gst_percentage),
    );
    if !gst.is_finite() || !(0.0..=100.0).contains(&gst) {
        println!("❌ GST percentage must be between 0 and 100. Nothing saved.");
        return;
    }
    let price = prompt_f64(
        "Default Base Price per kW (₹):",
        Some(current.default_base_price_per_kw),
    );
    if !price.is_finite() || price <= 0.0 {
        println!("❌ Base price must be positive. Nothing saved.");
        return;
    }

    match repo.update_settings(Some(gst), Some(price)) {
        Ok(()) => println!("✅ Settings saved."),
        Err(e) => println!("❌ {}", e),
    }
}

fn reset_wizard(repo: &mut Repository) {
    let confirmed = Confirm::new("Clear ALL projects and settings? This cannot be undone.")
        .with_default(false)
        .prompt()
        .unwrap_or(false);
    if !confirmed {
        println!("Cancelled.");
        return;
    }
    match repo.reset() {
        Ok(()) => println!("✅ All data cleared."),
        Err(e) => println!("❌ {}", e),
    }
}

// ==========================================
// 6. Config & Utilities
// ==========================================

fn get_config_path() -> PathBuf {
    if let Some(proj_dirs) = ProjectDirs::from("com", "solar-quote", "app") {
        let config_dir = proj_dirs.config_dir();
        if !config_dir.exists() {
            fs::create_dir_all(config_dir).ok();
        }
        return config_dir.join("settings.toml");
    }
    PathBuf::from("settings.toml")
}

fn load_app_config() -> Option<AppConfig> {
    let path = get_config_path();
    if !path.exists() {
        return None;
    }
    let content = fs::read_to_string(path).ok()?;
    toml::from_str(&content).ok()
}

fn setup_config_wizard() -> AppConfig {
    println!("\n⚙️  --- Configuration Setup ---");
    let current = load_app_config();
    let default_val = current
        .map(|c| c.data_root)
        .unwrap_or_else(|| "~/Documents/SolarQuotes".to_string());

    println!("📂 Opening folder picker...");
    let picked_path = rfd::FileDialog::new()
        .set_title("Select Root Data Directory")
        .pick_folder();

    let new_root = if let Some(path) = picked_path {
        path.to_string_lossy().to_string()
    } else {
        println!("❌ No folder selected. Falling back to manual input.");
        Text::new("Enter Root Data Directory:")
            .with_default(&default_val)
            .prompt()
            .unwrap_or(default_val)
    };

    let config = AppConfig { data_root: new_root };

    let path = get_config_path();
    let toml_str = toml::to_string_pretty(&config).unwrap();
    fs::write(&path, toml_str).expect("Failed to save settings");
    println!("✅ Settings saved.");
    config
}

fn expand_home_dir(path: &str) -> String {
    if path.starts_with("~") {
        if let Some(base_dirs) = BaseDirs::new() {
            let home = base_dirs.home_dir().to_string_lossy();
            return path.replacen("~", &home, 1);
        }
    }
    path.to_string()
}
