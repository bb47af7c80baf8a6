use std::path::PathBuf;
use std::time::Duration;

use anyhow::bail;
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};

use interest_bridge::api::handlers::CalculateResponse;
use interest_bridge::api::{init_tracing, run_api_server, ApiConfig};
use interest_bridge::config::{
    parse_origins, RecalcMode, SheetsConfig, DEFAULT_ALLOWED_ORIGINS, DEFAULT_CREDENTIALS_PATH,
};
use interest_bridge::gateway::DEFAULT_MAX_POLLS;
use interest_bridge::sheets::layout::{
    DEFAULT_CALC_SHEET, DEFAULT_COMPOUND_INTEREST_CELL, DEFAULT_INPUT_SHEET, DEFAULT_OUTPUT_SHEET,
    DEFAULT_PRINCIPAL_CELL, DEFAULT_RATE_CELL, DEFAULT_SIMPLE_INTEREST_CELL, DEFAULT_TIME_CELL,
};
use interest_bridge::sheets::{CellRef, SheetLayout};
use interest_bridge::validation::CalculationRequest;

#[derive(Parser)]
#[command(name = "interest-bridge")]
#[command(version)]
#[command(about = "Simple and compound interest, calculated by a Google Sheets workbook")]
#[command(long_about = r#"
Interest Bridge - HTTP front end for a Google Sheets interest calculator

Writes principal, rate and time into the workbook's Input sheet, waits for
its formulas to recompute, and reads simple and compound interest back from
the Output sheet. The bridge does no interest math itself.

COMMANDS:
  serve      - Run the HTTP API (default)
  verify     - Check the Input, Calc and Output sheets exist
  calculate  - Run one calculation and print the result as JSON

ENDPOINTS (serve):
  POST /calculate  {"principal": 10000, "rate": 5.5, "time": 3}
  GET  /verify     Sheet structure check
  GET  /health     200 healthy, 503 unhealthy
  GET  /           Service metadata

CONFIGURATION:
  Every flag also reads an environment variable; a .env file in the
  working directory is loaded first.

EXAMPLES:
  interest-bridge --sheet-id 1AbC... serve --port 8000
  interest-bridge verify
  interest-bridge calculate --principal 10000 --rate 5.5 --time 3
"#)]
struct Cli {
    /// Spreadsheet id (from the sheet URL)
    #[arg(long, env = "GOOGLE_SHEET_ID", global = true)]
    sheet_id: Option<String>,

    /// Service-account key file
    #[arg(long, env = "GOOGLE_CREDENTIALS_PATH", default_value = DEFAULT_CREDENTIALS_PATH, global = true)]
    credentials: PathBuf,

    /// Milliseconds to wait for the workbook to recompute
    #[arg(long, env = "RECALC_DELAY_MS", default_value_t = 500, global = true)]
    recalc_delay_ms: u64,

    /// Fixed single wait, or poll until the outputs stop changing
    #[arg(long, env = "RECALC_MODE", value_enum, default_value_t = RecalcMode::Fixed, global = true)]
    recalc_mode: RecalcMode,

    /// Reads before until-stable gives up
    #[arg(long, env = "RECALC_MAX_POLLS", default_value_t = DEFAULT_MAX_POLLS, global = true)]
    max_polls: u32,

    /// Host address to bind to
    #[arg(short = 'H', long, default_value = "0.0.0.0", env = "API_HOST", global = true)]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = 8000, env = "API_PORT", global = true)]
    port: u16,

    /// Comma-separated CORS origins, or * for any
    #[arg(long, default_value = DEFAULT_ALLOWED_ORIGINS, env = "ALLOWED_ORIGINS", global = true)]
    allowed_origins: String,

    #[command(flatten)]
    layout: LayoutArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Where the workbook expects its inputs and keeps its results.
#[derive(Args)]
#[command(next_help_heading = "Workbook layout")]
struct LayoutArgs {
    /// Sheet the inputs are written to
    #[arg(long, env = "INPUT_SHEET_NAME", default_value = DEFAULT_INPUT_SHEET, global = true)]
    input_sheet: String,

    /// Sheet holding the intermediate formulas
    #[arg(long, env = "CALC_SHEET_NAME", default_value = DEFAULT_CALC_SHEET, global = true)]
    calc_sheet: String,

    /// Sheet the results are read from
    #[arg(long, env = "OUTPUT_SHEET_NAME", default_value = DEFAULT_OUTPUT_SHEET, global = true)]
    output_sheet: String,

    /// Principal cell on the input sheet
    #[arg(long, env = "INPUT_PRINCIPAL_CELL", default_value = DEFAULT_PRINCIPAL_CELL, global = true)]
    principal_cell: CellRef,

    /// Rate cell on the input sheet
    #[arg(long, env = "INPUT_RATE_CELL", default_value = DEFAULT_RATE_CELL, global = true)]
    rate_cell: CellRef,

    /// Time cell on the input sheet
    #[arg(long, env = "INPUT_TIME_CELL", default_value = DEFAULT_TIME_CELL, global = true)]
    time_cell: CellRef,

    /// Simple interest cell on the output sheet
    #[arg(long, env = "OUTPUT_SI_CELL", default_value = DEFAULT_SIMPLE_INTEREST_CELL, global = true)]
    simple_interest_cell: CellRef,

    /// Compound interest cell on the output sheet
    #[arg(long, env = "OUTPUT_CI_CELL", default_value = DEFAULT_COMPOUND_INTEREST_CELL, global = true)]
    compound_interest_cell: CellRef,
}

impl LayoutArgs {
    fn layout(&self) -> SheetLayout {
        SheetLayout {
            input_sheet: self.input_sheet.clone(),
            calc_sheet: self.calc_sheet.clone(),
            output_sheet: self.output_sheet.clone(),
            principal_cell: self.principal_cell.clone(),
            rate_cell: self.rate_cell.clone(),
            time_cell: self.time_cell.clone(),
            simple_interest_cell: self.simple_interest_cell.clone(),
            compound_interest_cell: self.compound_interest_cell.clone(),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API server
    Serve,

    /// Check the spreadsheet has Input, Calc and Output sheets
    Verify,

    /// Run one calculation against the spreadsheet
    Calculate {
        /// Principal amount
        #[arg(long, allow_negative_numbers = true)]
        principal: f64,

        /// Annual rate in percent (0-100]
        #[arg(long, allow_negative_numbers = true)]
        rate: f64,

        /// Time in years
        #[arg(long, allow_negative_numbers = true)]
        time: f64,
    },
}

impl Cli {
    fn sheets_config(&self) -> SheetsConfig {
        SheetsConfig {
            sheet_id: self.sheet_id.clone(),
            credentials_path: self.credentials.clone(),
            recalc: self
                .recalc_mode
                .wait(Duration::from_millis(self.recalc_delay_ms), self.max_polls),
            layout: self.layout.layout(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing();

    let gateway = cli.sheets_config().build_gateway()?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            let layout = gateway.layout();
            info!(
                inputs = %format!("{}!{},{},{}", layout.input_sheet, layout.principal_cell, layout.rate_cell, layout.time_cell),
                outputs = %format!("{}!{},{}", layout.output_sheet, layout.simple_interest_cell, layout.compound_interest_cell),
                "Workbook layout"
            );
            if let Err(e) = gateway.connect().await {
                warn!(error = %e, "Spreadsheet not reachable at startup; will retry on first request");
            }
            let config = ApiConfig {
                host: cli.host,
                port: cli.port,
                allowed_origins: parse_origins(&cli.allowed_origins),
            };
            run_api_server(config, gateway).await
        }

        Commands::Verify => {
            let session = gateway.connect().await?;
            let report = gateway.verify_structure().await?;
            if !report.ok {
                bail!(report.message);
            }
            info!(title = %session.title(), "{}", report.message);
            println!("{}", report.message);
            Ok(())
        }

        Commands::Calculate {
            principal,
            rate,
            time,
        } => {
            let request = CalculationRequest::new(principal, rate, time).validate()?;
            let outputs = gateway.calculate(&request).await?;
            let response = CalculateResponse::new(&request, &outputs);
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
    }
}
