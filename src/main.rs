// Entry point and high-level CLI flow.
//
// - Option [1] loads and cleans the performance CSV (and group file, if
//   given), printing diagnostics.
// - Option [2] generates the reports and a JSON summary.
// - After generating reports, the user can choose to go back to the
//   selection menu or exit.
use std::io::{self, Write};
use std::sync::{Mutex, MutexGuard};

use clap::Parser;
use client_metrics::aggregate::distinct_entities;
use client_metrics::config::{self, Cli, ReportSettings};
use client_metrics::types::{EntityGroup, PerformanceRecord};
use client_metrics::{loader, output, reports, util, AppError};
use once_cell::sync::Lazy;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

// Loaded data lives here so the CSV is read once but reports can be
// generated several times in a single run.
static APP_STATE: Lazy<Mutex<AppState>> = Lazy::new(|| Mutex::new(AppState::default()));

#[derive(Default)]
struct AppState {
    data: Option<Vec<PerformanceRecord>>,
    groups: Vec<EntityGroup>,
}

fn app_state() -> MutexGuard<'static, AppState> {
    APP_STATE.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Read a single line of input after printing the common "Enter choice:" prompt.
///
/// Returns `None` once stdin is closed.
fn read_choice() -> Option<String> {
    print!("Enter choice: ");
    let _ = io::stdout().flush();
    let mut buf = String::new();
    match io::stdin().read_line(&mut buf) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(buf.trim().to_string()),
    }
}

/// Ask the user whether to go back to the menu after generating reports.
///
/// Returns `true` for `Y`, `false` for `N` or end of input.
fn prompt_back_to_menu() -> bool {
    loop {
        print!("Back to Report Selection (Y/N): ");
        let _ = io::stdout().flush();
        let mut buf = String::new();
        match io::stdin().read_line(&mut buf) {
            Ok(0) | Err(_) => return false,
            Ok(_) => {}
        }
        match buf.trim().to_uppercase().as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

/// Handle option [1]: load the CSV and resolve the group selection.
fn handle_load(cli: &Cli) -> Result<(), AppError> {
    let (data, load_report) = loader::load_and_clean(&cli.input)?;
    println!(
        "Processing dataset... ({} rows read, {} loaded across {} clients)",
        util::format_int(load_report.total_rows),
        util::format_int(load_report.loaded_rows),
        util::format_int(load_report.entities)
    );
    if load_report.parse_errors > 0 {
        println!(
            "Note: {} rows skipped due to parse/validation errors.",
            util::format_int(load_report.parse_errors)
        );
    }

    let groups = match &cli.groups {
        Some(path) => config::load_groups(path)?,
        None => vec![config::default_group(&distinct_entities(&data))],
    };
    println!("Groups: {}\n", groups.iter().map(|g| g.name.as_str()).collect::<Vec<_>>().join(", "));

    let mut state = app_state();
    state.data = Some(data);
    state.groups = groups;
    Ok(())
}

/// Handle option [2]: generate all reports and the JSON summary.
///
/// Writes four CSV files and `summary.json` into the output directory and
/// prints Markdown previews of each report.
fn handle_generate_reports(cli: &Cli, settings: &ReportSettings) -> Result<(), AppError> {
    let (data, groups) = {
        let state = app_state();
        (state.data.clone(), state.groups.clone())
    };
    let Some(data) = data else {
        return Err(AppError::NoData(
            "no data loaded, please load the CSV file first (option 1)".to_string(),
        ));
    };

    println!("Generating reports as of {}...\n", settings.reference_date);
    let bundle = reports::generate_reports(&data, &groups, settings);
    std::fs::create_dir_all(&cli.out_dir)?;

    let file1 = cli.out_dir.join("report1_group_kpis.csv");
    output::write_csv(&file1, &bundle.kpis)?;
    output::preview_table(1, "Group KPIs (latest month, projected when partial)", None, &bundle.kpis, 5);
    println!("(Full table exported to {})\n", file1.display());

    let file2 = cli.out_dir.join("report2_monthly_trends.csv");
    output::write_csv(&file2, &bundle.trends)?;
    let note = format!("Last {} closed months per group", settings.months_back);
    output::preview_table(2, "Monthly Trends", Some(note.as_str()), &bundle.trends, 6);
    println!("(Full table exported to {})\n", file2.display());

    let file3 = cli.out_dir.join("report3_client_leaderboard.csv");
    output::write_csv(&file3, &bundle.leaderboard)?;
    let note = format!("Top {} clients by revenue", settings.top);
    output::preview_table(3, "Client Leaderboard", Some(note.as_str()), &bundle.leaderboard, 5);
    println!("(Full table exported to {})\n", file3.display());

    let file4 = cli.out_dir.join("report4_metric_alerts.csv");
    output::write_csv(&file4, &bundle.alerts)?;
    let metric = settings.alert_metric.label();
    let note = if settings.alert_threshold == 0.0 {
        format!("All clients, largest MoM {} change first", metric)
    } else {
        format!(
            "MoM {} change of at least {}%",
            metric,
            util::format_number(settings.alert_threshold, 2)
        )
    };
    output::preview_table(4, "Metric Alerts", Some(note.as_str()), &bundle.alerts, 5);
    println!("(Full table exported to {})\n", file4.display());

    let summary_path = cli.out_dir.join("summary.json");
    output::write_json(&summary_path, &bundle.summary)?;
    println!("Summary Stats ({}):", summary_path.display());
    println!(
        "{{\"projected_revenue\": {}, \"blended_roas\": {}, \"alerts\": {}}}\n",
        util::format_number(bundle.summary.projected_revenue, 2),
        util::format_number(bundle.summary.blended_roas, 2),
        bundle.summary.alert_count
    );
    info!(out_dir = %cli.out_dir.display(), "reports written");
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = match cli.settings(chrono::Local::now().date_naive()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(2);
        }
    };

    loop {
        println!("Client Performance Reports");
        println!("[1] Load the file");
        println!("[2] Generate Reports\n");
        let Some(choice) = read_choice() else {
            println!("Exiting the program.");
            break;
        };
        match choice.as_str() {
            "1" => {
                if let Err(e) = handle_load(&cli) {
                    error!(error = %e, "load failed");
                    eprintln!("Failed to load file: {}\n", e);
                }
            }
            "2" => {
                println!();
                if let Err(e) = handle_generate_reports(&cli, &settings) {
                    eprintln!("Error: {}\n", e);
                    continue;
                }
                if !prompt_back_to_menu() {
                    println!("Exiting the program.");
                    break;
                }
            }
            _ => {
                println!("Invalid choice. Please enter 1 or 2.\n");
            }
        }
    }
}
