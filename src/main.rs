// ==========================================
// Warehouse Receipting - CLI entry point
// ==========================================
// Operational commands around the store: apply migrations and run the
// CSV exports. The interactive surfaces (scanning, review) live in the
// HTTP shell, which links the library directly.
// ==========================================

use receipting_core::{CancelToken, Exporter, Store};
use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    receipting_core::logging::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &[String]) -> Result<(), String> {
    let Some(command) = args.first() else {
        print_usage();
        return Ok(());
    };

    match command.as_str() {
        "migrate" => {
            let db_path = arg_value(args, "--db").unwrap_or_else(default_db_path);
            Store::open(&db_path).map_err(|e| e.to_string())?;
            tracing::info!(%db_path, "migrations applied");
            println!("store ready at {db_path}");
            Ok(())
        }
        "export-receipts" => export(args, "receipts"),
        "export-pallets" => export(args, "pallets"),
        "--version" | "-V" => {
            println!("{} {}", receipting_core::APP_NAME, receipting_core::VERSION);
            Ok(())
        }
        other => {
            print_usage();
            Err(format!("unknown command '{other}'"))
        }
    }
}

fn export(args: &[String], kind: &str) -> Result<(), String> {
    let db_path = arg_value(args, "--db").unwrap_or_else(default_db_path);
    let project_id: i64 = arg_value(args, "--project")
        .ok_or("--project <id> is required")?
        .parse()
        .map_err(|_| "--project must be an integer".to_string())?;
    let out_path = arg_value(args, "--out").ok_or("--out <file> is required")?;

    let store = Store::open(&db_path).map_err(|e| e.to_string())?;
    let exporter = Exporter::new(store);
    let cancel = CancelToken::none();

    let file = File::create(&out_path).map_err(|e| format!("cannot create {out_path}: {e}"))?;

    let rows = match kind {
        "receipts" => exporter.receipts_csv(None, project_id, file, &cancel),
        _ => exporter.pallet_status_csv(None, project_id, file, &cancel),
    }
    .map_err(|e| e.to_string())?;

    println!("wrote {rows} rows to {out_path}");
    Ok(())
}

fn arg_value(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|idx| args.get(idx + 1))
        .cloned()
}

fn default_db_path() -> String {
    let mut path = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("receipting");
    if let Err(e) = std::fs::create_dir_all(&path) {
        tracing::warn!("cannot create data dir {}: {e}", path.display());
    }
    path.push("receipting.db");
    path.to_string_lossy().into_owned()
}

fn print_usage() {
    println!("usage: receipting <command> [options]");
    println!();
    println!("commands:");
    println!("  migrate                                  apply pending migrations");
    println!("  export-receipts --project <id> --out <file>   write the receipts CSV");
    println!("  export-pallets  --project <id> --out <file>   write the pallet status CSV");
    println!();
    println!("options:");
    println!("  --db <path>   data file (default: user data dir)");
}
