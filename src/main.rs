use crate::portfolio::{Portfolio, StockRow};
use crate::quote::{AlphaVantage, QuoteProvider, DEFAULT_API_KEY_VAR, DEFAULT_BASE_URL};
use crate::valuation::{format_percent, format_price, format_value, Outlook};

use clap::{arg, Arg, ArgAction, ArgMatches, Command};
use colored::Colorize;
use serde::Deserialize;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

mod error;
mod form;
mod portfolio;
mod quote;
mod stock;
mod tui;
mod valuation;

const APP_NAME: &str = "pe_ratio_rs";

#[derive(Serialize, Deserialize)]
#[serde(default)]
struct Config {
    api_key_var: String,
    base_url: String,
    log_file: String,
    seed_examples: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key_var: DEFAULT_API_KEY_VAR.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            log_file: String::new(),
            seed_examples: true,
        }
    }
}

impl Config {
    fn provider(&self) -> AlphaVantage {
        AlphaVantage::new(&self.base_url, &self.api_key_var)
    }

    fn starting_portfolio(&self) -> Portfolio {
        if self.seed_examples {
            Portfolio::seeded()
        } else {
            Portfolio::new()
        }
    }
}

fn cli() -> Command {
    Command::new(APP_NAME)
        .about("Compare current and target P/E ratios of your stocks")
        .arg_required_else_help(true)
        .subcommand(Command::new("config").about("Print the path to the config file"))
        .subcommand(Command::new("dashboard").about("Open the interactive P/E dashboard"))
        .subcommand(
            Command::new("table")
                .about("Print the portfolio with target prices and implied price changes")
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Print the rows as JSON instead of a table"),
                )
                .arg(
                    arg!([STOCKS] ... "Live stocks to add, as TICKER=TARGET_PE")
                        .required(false),
                ),
        )
        .subcommand(
            Command::new("quote")
                .about("Fetch the latest price and EPS of a ticker")
                .arg(arg!(<TICKER> "Ticker symbol, e.g. AAPL")),
        )
}

/// Logs go to stderr, or to the configured file for the dashboard since
/// stderr would draw over the alternate screen.
fn init_logging(cfg: &Config, dashboard: bool) -> eyre::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    if dashboard {
        if cfg.log_file.is_empty() {
            return Ok(());
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&cfg.log_file)?;
        builder
            .with_ansi(false)
            .with_writer(std::sync::Mutex::new(file))
            .init();
    } else {
        builder.with_writer(std::io::stderr).init();
    }
    Ok(())
}

/// Splits `TICKER=PE` into the two raw form values.
fn parse_stock_arg(arg: &str) -> Option<(&str, &str)> {
    let (ticker, target_pe) = arg.split_once('=')?;
    Some((ticker.trim(), target_pe.trim()))
}

async fn add_live_stocks<P: QuoteProvider>(portfolio: &mut Portfolio, provider: &P, stocks: &[String]) {
    for stock in stocks {
        let Some((ticker, target_pe)) = parse_stock_arg(stock) else {
            eprintln!("{} expected TICKER=TARGET_PE, got '{stock}'", "Error:".red().bold());
            continue;
        };
        let mut form = form::QuoteForm {
            ticker: ticker.to_string(),
            target_pe: target_pe.to_string(),
        };
        match portfolio.add_from_quote(provider, &mut form).await {
            Ok(id) => {
                if let Some(entry) = portfolio.get(id) {
                    eprintln!("{} {} ({})", "Added".green(), entry.get_ticker(), entry.get_name());
                }
            }
            Err(e) => eprintln!("{} {e}", "Error:".red().bold()),
        }
    }
}

// Print the portfolio as a table
fn print_table(rows: &[StockRow]) {
    use comfy_table::{presets::UTF8_FULL, Attribute, Cell, CellAlignment, Color as TColor, ContentArrangement, Table};

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);

    table.set_header(vec![
        Cell::new("Ticker").add_attribute(Attribute::Bold),
        Cell::new("Name").add_attribute(Attribute::Bold),
        Cell::new("Price").add_attribute(Attribute::Bold),
        Cell::new("EPS").add_attribute(Attribute::Bold),
        Cell::new("P/E").add_attribute(Attribute::Bold),
        Cell::new("Target P/E").add_attribute(Attribute::Bold),
        Cell::new("Target Price").add_attribute(Attribute::Bold),
        Cell::new("Change").add_attribute(Attribute::Bold),
    ]);

    for row in rows {
        let change_color = match row.valuation.outlook() {
            Outlook::Gain => TColor::Green,
            Outlook::Loss => TColor::Red,
            Outlook::Neutral => TColor::Grey,
        };
        table.add_row(vec![
            Cell::new(row.entry.get_ticker()).add_attribute(Attribute::Bold),
            Cell::new(row.entry.get_name()),
            Cell::new(format_price(row.entry.get_current_price())).set_alignment(CellAlignment::Right),
            Cell::new(format_value(row.entry.get_eps())).set_alignment(CellAlignment::Right),
            Cell::new(format_value(row.valuation.current_pe)).set_alignment(CellAlignment::Right),
            Cell::new(format_value(row.entry.get_target_pe())).set_alignment(CellAlignment::Right),
            Cell::new(format_price(row.valuation.target_price)).set_alignment(CellAlignment::Right),
            Cell::new(format_percent(row.valuation.price_change))
                .set_alignment(CellAlignment::Right)
                .fg(change_color),
        ]);
    }

    println!("{table}");
}

async fn run_table(cfg: &Config, matches: &ArgMatches) -> eyre::Result<()> {
    let mut portfolio = cfg.starting_portfolio();
    let stocks: Vec<String> = matches
        .get_many::<String>("STOCKS")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();

    add_live_stocks(&mut portfolio, &cfg.provider(), &stocks).await;

    if matches.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&portfolio.rows())?);
    } else if portfolio.is_empty() {
        println!("No data to display");
    } else {
        print_table(&portfolio.rows());
    }
    Ok(())
}

/// Fails the process on a fetch error so scripts can tell.
async fn run_quote(cfg: &Config, ticker: &str) -> eyre::Result<()> {
    let quote = cfg.provider().fetch_quote(ticker).await?;
    println!("{} ({})", quote.name.bold(), quote.ticker);
    println!("  Price: {:>10}", format_price(quote.current_price));
    println!("  EPS:   {:>10}", format_value(quote.eps));
    println!("  P/E:   {:>10}", format_value(quote.current_pe));
    println!(
        "  {}",
        format!("as of {}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S")).dimmed()
    );
    Ok(())
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let cfg: Config = confy::load(APP_NAME, "config")?;
    let matches = cli().get_matches();

    init_logging(&cfg, matches.subcommand_name() == Some("dashboard"))?;

    match matches.subcommand() {
        Some(("config", _)) => {
            let path = confy::get_configuration_file_path(APP_NAME, "config")?;
            println!("Your config file is located here: \n{}", path.display());
        }
        Some(("dashboard", _)) => {
            tui::run_dashboard(cfg.starting_portfolio(), cfg.provider()).await?;
        }
        Some(("table", sub)) => run_table(&cfg, sub).await?,
        Some(("quote", sub)) => {
            if let Some(ticker) = sub.get_one::<String>("TICKER") {
                run_quote(&cfg, ticker).await?;
            }
        }
        _ => cli().print_help()?,
    }
    Ok(())
}
