use std::fs;
use std::path::Path;
use std::process::Command;

use serde::Serialize;
use slug::slugify;
use tera::{Context, Tera};

use crate::calc::{format_currency, format_number};
use crate::model::{PersonalDetails, Project};

// Embed template at compile time to ensure availability
const DEFAULT_TEMPLATE: &str = include_str!("../templates/quotation.tera");

#[derive(Serialize)]
struct QuoteContext {
    id: String,
    date: String,
    status: String,
    client: PersonalDetails,
    make: String,
    watt_peak: String,
    number_of_panels: u32,
    system_size: String,
    base_price_per_kw: String,
    gst_percentage: String,
    total_base_price: String,
    gst_amount: String,
    cleaning_charges: String,
    subsidy: String,
    total_payable_amount: String,
}

pub fn generate_quotation_pdf(root: &Path, project: &Project) {
    // Check if Typst is installed
    if Command::new("typst").arg("--version").output().is_err() {
        println!("❌ Error: 'typst' is not installed. Please install it (brew install typst).");
        return;
    }

    // Initialize template
    let template_dir = root.join("templates");
    if !template_dir.exists() {
        fs::create_dir_all(&template_dir).unwrap();
    }
    let template_path = template_dir.join("quotation.tera");
    if !template_path.exists() {
        println!("✨ Initializing default template...");
        fs::write(&template_path, DEFAULT_TEMPLATE).expect("Failed to write default template");
    }

    let tera = match Tera::new(template_dir.join("*.tera").to_str().unwrap()) {
        Ok(t) => t,
        Err(e) => {
            println!("❌ Template Error: {}", e);
            return;
        }
    };

    let config = &project.system_configuration;
    let calc = &project.calculations;
    let context_data = QuoteContext {
        id: project.id.clone(),
        date: project.created_at.format("%d/%m/%Y").to_string(),
        status: project.status.to_string(),
        client: project.personal_details.clone(),
        make: config.make.clone(),
        watt_peak: format_number(config.watt_peak),
        number_of_panels: config.number_of_panels,
        system_size: format_number(calc.system_size),
        base_price_per_kw: format_currency(config.base_price_per_kw),
        gst_percentage: format!("{}%", config.gst_percentage),
        total_base_price: format_currency(calc.total_base_price),
        gst_amount: format_currency(calc.gst_amount),
        cleaning_charges: format_currency(config.cleaning_charges),
        subsidy: format_currency(config.subsidy),
        total_payable_amount: format_currency(calc.total_payable_amount),
    };

    let context = Context::from_serialize(&context_data).unwrap();
    let rendered = match tera.render("quotation.tera", &context) {
        Ok(r) => r,
        Err(e) => {
            println!("❌ Template Error: {}", e);
            return;
        }
    };

    let output_dir = root
        .join("output")
        .join(project.created_at.format("%Y").to_string());
    fs::create_dir_all(&output_dir).unwrap();

    // Filename: SQ1756100000000_asha-patel.pdf
    let filename_base = format!("{}_{}", project.id, slugify(&project.personal_details.name));
    let typ_path = output_dir.join(format!("{}.typ", filename_base));
    let pdf_path = output_dir.join(format!("{}.pdf", filename_base));

    fs::write(&typ_path, rendered).expect("Failed to write .typ file");

    println!("\n🔨 Compiling PDF...");
    match Command::new("typst")
        .arg("compile")
        .arg(&typ_path)
        .arg(&pdf_path)
        .status()
    {
        Ok(s) if s.success() => {
            println!("✅ PDF Generated: {:?}", pdf_path);
            open_and_reveal(&pdf_path);
        }
        _ => println!("❌ Compilation failed."),
    }
}

// Helper: Open file and reveal in Finder/Explorer
fn open_and_reveal(path: &Path) {
    #[cfg(target_os = "macos")]
    Command::new("open").arg("-R").arg(path).spawn().ok();

    #[cfg(target_os = "windows")]
    Command::new("explorer")
        .arg(format!("/select,{}", path.to_string_lossy()))
        .spawn()
        .ok();

    #[cfg(target_os = "linux")]
    if let Some(parent) = path.parent() {
        Command::new("xdg-open").arg(parent).spawn().ok();
    }

    #[cfg(target_os = "macos")]
    Command::new("open").arg(path).spawn().ok();

    #[cfg(target_os = "windows")]
    Command::new("explorer").arg(path).spawn().ok();

    #[cfg(target_os = "linux")]
    Command::new("xdg-open").arg(path).spawn().ok();
}
