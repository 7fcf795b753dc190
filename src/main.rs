//! payslip – command-line payslip generator.
//!
//! Reads the form fields from a JSON file, previews the payslip and exports
//! it as a single-page PDF named `{employeeName}_{payslipMonth}_payslip.pdf`.

use std::path::PathBuf;
use std::process;

use chrono::Local;
use clap::Parser;

use payslip_forge::template::standalone_document;
use payslip_forge::{
    FormController, FsFileReader, ImageInput, LayoutRasterizer, PayslipConfig, PayslipForm,
    PdfExporter, PrintPdfEncoder, Rasterizer, SlotKind,
};

#[derive(Parser)]
#[command(name = "payslip")]
#[command(about = "Generate a salary slip as HTML and a single-page PDF")]
#[command(version)]
struct Cli {
    /// JSON file with the form fields (camelCase keys, string values)
    #[arg(long)]
    form: PathBuf,

    /// Company logo: file path or URL (default: logo.png next to the form)
    #[arg(long, value_name = "REF")]
    logo: Option<String>,

    /// Employer signature: file path or URL
    #[arg(long, value_name = "REF")]
    employer_signature: Option<String>,

    /// Employee signature: file path or URL
    #[arg(long, value_name = "REF")]
    employee_signature: Option<String>,

    /// Also write the previewed payslip as a standalone HTML page
    #[arg(long, value_name = "FILE")]
    html: Option<PathBuf>,

    /// Directory the PDF is written to
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// JSON config for capture and page settings
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Skip the PDF export
    #[arg(long)]
    no_pdf: bool,

    /// Print the captured display list as JSON
    #[arg(long)]
    dump_surface: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> payslip_forge::Result<()> {
    let mut config = match &cli.config {
        Some(path) => PayslipConfig::load(path)?,
        None => PayslipConfig::default(),
    };
    // Relative image references resolve next to the form unless configured.
    if config.capture.asset_root == PathBuf::from(".") {
        if let Some(parent) = cli.form.parent().filter(|p| !p.as_os_str().is_empty()) {
            config.capture.asset_root = parent.to_path_buf();
        }
    }

    let json = tokio::fs::read_to_string(&cli.form).await?;
    let form: PayslipForm = serde_json::from_str(&json)?;

    let today = Local::now().date_naive();
    let mut controller = FormController::new(today);
    {
        // Blank dates in the file keep today's defaults.
        let defaults = controller.form().clone();
        let target = controller.form_mut();
        *target = form;
        if target.payslip_month.trim().is_empty() {
            target.payslip_month = defaults.payslip_month;
        }
        if target.payment_date.trim().is_empty() {
            target.payment_date = defaults.payment_date;
        }
    }

    let choices = [
        (SlotKind::Logo, &cli.logo),
        (SlotKind::EmployerSignature, &cli.employer_signature),
        (SlotKind::EmployeeSignature, &cli.employee_signature),
    ];
    for (kind, choice) in choices {
        if let Some(arg) = choice {
            controller
                .resolve_image(kind, ImageInput::from_arg(arg), &FsFileReader)
                .await;
        }
    }

    controller.preview()?;

    if let Some(path) = &cli.html {
        let page = standalone_document(controller.view(), &config.title);
        tokio::fs::write(path, page).await?;
        eprintln!("Wrote '{}'", path.display());
    }

    if cli.dump_surface {
        let surface = LayoutRasterizer
            .capture(controller.view(), &config.capture)
            .await?;
        println!("{}", surface.to_json());
    }

    if cli.no_pdf {
        return Ok(());
    }

    let exporter: PdfExporter<_, PrintPdfEncoder> = PdfExporter::new(
        LayoutRasterizer,
        config.capture.clone(),
        config.document,
        config.title.clone(),
    );
    let file = controller.export(&exporter, today).await?;
    let path = file.write_atomically(&cli.out_dir).await?;
    eprintln!("Wrote '{}' ({} bytes)", path.display(), file.bytes.len());
    Ok(())
}
