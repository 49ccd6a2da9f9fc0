use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Deserialize;
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_subscriber::EnvFilter;
use vilocify::models::{Component, ComponentRequest, MonitoringList, Notification, Vulnerability};
use vilocify::purl::{match_purl, ComponentMatch, Purl};
use vilocify::{Api, Resource};

/// Command line client for the Vilocify APIv2
#[derive(Parser, Debug)]
#[command(name = "vilocify", version, about, long_about = None)]
struct Args {
    /// Log level for diagnostics on stderr
    #[arg(long, value_enum, global = true, default_value = "off")]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print all notifications for a monitoring list since a given date
    Notifications {
        /// The monitoring list to print notifications for
        #[arg(long = "for", value_name = "MONITORING_LIST_ID")]
        monitoring_list: String,

        /// Only notifications published after this instant, RFC 3339 or
        /// YYYY-MM-DD. Defaults to 24 hours ago.
        #[arg(long)]
        since: Option<String>,
    },

    /// Manage monitoring lists
    #[command(subcommand, name = "monitoring-list")]
    MonitoringList(MonitoringListCommand),

    /// List component requests by processing state
    ComponentRequest {
        /// Filter component requests by state, defaults to every state
        #[arg(long, value_enum)]
        state: Vec<RequestState>,
    },
}

#[derive(Subcommand, Debug)]
enum MonitoringListCommand {
    /// Print the components of a monitoring list as CSV
    Show {
        /// The monitoring list id
        #[arg(long)]
        id: String,

        /// The format used to print details
        #[arg(long, value_enum, default_value = "extendedcsv")]
        format: ShowFormat,
    },

    /// Create or update a monitoring list from a CycloneDX JSON SBOM
    ///
    /// The monitoring list is identified by name and comment; changing either
    /// between runs creates a new list. Components that cannot be identified
    /// get a component request filed. Requests may take days to be processed,
    /// so rerunning the same import picks up newly mapped components.
    Import {
        /// The monitoring list name
        #[arg(long)]
        name: String,

        /// The comment set on the monitoring list
        #[arg(long, default_value = "")]
        comment: String,

        /// Skip interactive questions, assuming yes for all answers
        #[arg(long)]
        yes: bool,

        /// The CycloneDX JSON file to import
        #[arg(long = "from-cyclonedx", value_name = "FILE")]
        from_cyclonedx: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ShowFormat {
    #[value(name = "extendedcsv")]
    ExtendedCsv,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum RequestState {
    Unprocessed,
    Rejected,
    Mapped,
}

impl RequestState {
    fn as_str(self) -> &'static str {
        match self {
            RequestState::Unprocessed => "unprocessed",
            RequestState::Rejected => "rejected",
            RequestState::Mapped => "mapped",
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn setup_logging(level: LogLevel) {
    // RUST_LOG wins over the flag.
    let filter = if std::env::var_os(EnvFilter::DEFAULT_ENV).is_some() {
        EnvFilter::from_default_env()
    } else if let Some(level) = level.to_tracing_level() {
        EnvFilter::new(level.to_string())
    } else {
        return;
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .init();
}

fn main() {
    let args = Args::parse();
    setup_logging(args.log_level);

    if let Err(err) = run(args) {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let api = Api::from_env().context("cannot configure the API client")?;
    match args.command {
        Command::Notifications {
            monitoring_list,
            since,
        } => {
            let since = match since.as_deref() {
                Some(raw) => parse_since(raw)?,
                None => Utc::now() - chrono::Duration::days(1),
            };
            cmd_notifications(&api, &monitoring_list, since)
        }
        Command::MonitoringList(MonitoringListCommand::Show { id, format: _ }) => {
            cmd_show(&api, &id)
        }
        Command::MonitoringList(MonitoringListCommand::Import {
            name,
            comment,
            yes,
            from_cyclonedx,
        }) => cmd_import(&api, &name, &comment, yes, &from_cyclonedx),
        Command::ComponentRequest { state } => cmd_component_requests(&api, &state),
    }
}

fn parse_since(input: &str) -> Result<DateTime<Utc>> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(input) {
        return Ok(instant.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S") {
        return Ok(naive.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(naive.and_utc());
        }
    }
    bail!("cannot parse {input:?} as a date, expected RFC 3339 or YYYY-MM-DD");
}

fn cmd_notifications(api: &Api, monitoring_list: &str, since: DateTime<Utc>) -> Result<()> {
    let since_param = since.to_rfc3339();
    let query = Notification::filter("monitoringLists.id", "any", monitoring_list)
        .filter("createdAt", "after", since_param.as_str());

    let mut seen = false;
    for notification in query.iter(api) {
        let notification = notification?;
        seen = true;
        println!();
        println!("---");
        println!("Title: {}", notification.title().unwrap_or_default());
        println!("Description:");
        for line in notification.description().unwrap_or_default().lines() {
            if line.trim().is_empty() {
                println!();
            } else {
                println!("  {line}");
            }
        }
        println!("Vulnerabilities:");
        let ids = notification.vulnerabilities().ids(api)?;
        for vulnerability in Vulnerability::filter("id", "in", ids).iter(api) {
            let vulnerability = vulnerability?;
            let cvss = vulnerability
                .cvss()
                .map(|scores| serde_json::Value::Array(scores).to_string())
                .unwrap_or_default();
            println!("  - CVE: {}", vulnerability.cve().unwrap_or_default());
            println!("    CVSS: {cvss}");
            println!(
                "    Description: {}",
                vulnerability.description().unwrap_or_default()
            );
        }
    }

    if !seen {
        println!(
            "No new notifications for monitoring list #{monitoring_list} since {since_param}."
        );
    }
    Ok(())
}

fn cmd_show(api: &Api, id: &str) -> Result<()> {
    let list = MonitoringList::get(api, id)?;
    let device = list.name().unwrap_or_default();

    let mut out = io::stdout().lock();
    write_csv_row(&mut out, &["device", "vendor", "name", "version"])?;
    for component in list.components().get(api)? {
        let vendor = component.vendor().unwrap_or_default();
        let name = component.name().unwrap_or_default();
        let version = component.version().unwrap_or_default();
        write_csv_row(&mut out, &[&device, &vendor, &name, &version])?;
    }
    Ok(())
}

/// Minimal RFC 4180 row writer, quoting only fields that need it.
fn write_csv_row<W: Write>(out: &mut W, fields: &[&str]) -> io::Result<()> {
    let mut first = true;
    for field in fields {
        if !first {
            out.write_all(b",")?;
        }
        first = false;
        if field.contains(['"', ',', '\n', '\r']) {
            write!(out, "\"{}\"", field.replace('"', "\"\""))?;
        } else {
            out.write_all(field.as_bytes())?;
        }
    }
    out.write_all(b"\r\n")
}

#[derive(Debug, Deserialize)]
struct CycloneDxBom {
    #[serde(default)]
    components: Vec<CycloneDxComponent>,
}

#[derive(Debug, Deserialize)]
struct CycloneDxComponent {
    #[serde(default)]
    name: String,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    purl: Option<String>,
}

/// An SBOM component with no counterpart in the component database yet.
struct Unidentified {
    bom_name: String,
    bom_version: Option<String>,
    purl: String,
    matched: ComponentMatch,
}

type ComponentCache = HashMap<(String, String), Component>;

fn cmd_import(api: &Api, name: &str, comment: &str, yes: bool, file: &Path) -> Result<()> {
    let bom = load_bom(file)?;
    let list = load_monitoring_list(api, name, comment)?;

    let cache: ComponentCache = list
        .components()
        .get(api)?
        .into_iter()
        .filter_map(|component| {
            let key = (component.name()?, component.version()?);
            Some((key, component))
        })
        .collect();

    let (mut components, unidentified) = match_bom(api, &cache, &bom)?;

    let mut pending_requests = Vec::new();
    for item in &unidentified {
        let existing = ComponentRequest::filter("componentUrl", "eq", item.purl.as_str()).first(api)?;
        match existing {
            None => {
                let request = ComponentRequest::new();
                request.set_name(
                    item.matched
                        .name
                        .clone()
                        .unwrap_or_else(|| item.bom_name.clone()),
                );
                if let Some(version) = item.matched.version.clone().or_else(|| item.bom_version.clone())
                {
                    request.set_version(version);
                }
                request.set_component_url(item.purl.clone());
                request.set_comment("Auto-created by vilocify-sdk-rust");
                tracing::info!("could not find a component for {}", item.purl);
                pending_requests.push(request);
            }
            Some(request) => {
                if let Some(component) = request.component().get(api)? {
                    tracing::info!(
                        "found component {} for {} through component request {}",
                        component.id().unwrap_or_default(),
                        item.purl,
                        request.id().unwrap_or_default()
                    );
                    components.push(component);
                } else if let Some(state) = request.state() {
                    if state == "unprocessed" || state == "rejected" {
                        tracing::info!(
                            "the component request {} for {} is {state}",
                            request.id().unwrap_or_default(),
                            item.purl
                        );
                    }
                }
            }
        }
    }

    if !pending_requests.is_empty() {
        println!(
            "{} components could not be identified directly nor through existing component requests.",
            pending_requests.len()
        );
        let prompt = format!("Create {} component requests? (y/n) ", pending_requests.len());
        if yes || confirm(&prompt)? {
            for request in &pending_requests {
                request.create(api)?;
            }
        }
    }

    list.components().replace(&components);
    list.update(api)?;
    tracing::info!(
        "finished updating monitoring list {}",
        list.id().unwrap_or_default()
    );
    Ok(())
}

fn load_bom(path: &Path) -> Result<CycloneDxBom> {
    if path.extension().and_then(std::ffi::OsStr::to_str) != Some("json") {
        bail!("the CycloneDX file must end with .json");
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    let bom: CycloneDxBom = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a CycloneDX JSON document", path.display()))?;

    if bom.components.len() > MonitoringList::MAX_COMPONENTS {
        bail!(
            "the CycloneDX file contains more than {} components, but monitoring lists cannot hold more than {} components",
            MonitoringList::MAX_COMPONENTS,
            MonitoringList::MAX_COMPONENTS
        );
    }
    Ok(bom)
}

fn load_monitoring_list(api: &Api, name: &str, comment: &str) -> Result<MonitoringList> {
    let existing = MonitoringList::filter("name", "eq", name)
        .filter("comment", "eq", comment)
        .first(api)?;
    let list = match existing {
        Some(list) => list,
        None => {
            tracing::info!("no monitoring list with the given name and comment, creating one");
            let list = MonitoringList::new();
            list.set_name(name);
            list.set_comment(comment);
            list.create(api)?;
            list
        }
    };
    tracing::info!("using monitoring list {}", list.id().unwrap_or_default());
    Ok(list)
}

fn match_bom(
    api: &Api,
    cache: &ComponentCache,
    bom: &CycloneDxBom,
) -> Result<(Vec<Component>, Vec<Unidentified>)> {
    let mut components = Vec::new();
    let mut unidentified = Vec::new();

    for bom_component in &bom.components {
        let Some(raw_purl) = &bom_component.purl else {
            tracing::warn!(
                "ignoring BOM component {} due to missing purl",
                bom_component.name
            );
            continue;
        };
        let purl = match Purl::parse(raw_purl) {
            Ok(purl) => purl,
            Err(err) => {
                tracing::warn!("ignoring BOM component {}: {err}", bom_component.name);
                continue;
            }
        };
        let matched = match_purl(&purl);
        match find_component(api, cache, &matched)? {
            Some(component) => {
                tracing::info!(
                    "found component {} for {raw_purl}",
                    component.id().unwrap_or_default()
                );
                components.push(component);
            }
            None => unidentified.push(Unidentified {
                bom_name: bom_component.name.clone(),
                bom_version: bom_component.version.clone(),
                purl: raw_purl.clone(),
                matched,
            }),
        }
    }
    Ok((components, unidentified))
}

fn find_component(
    api: &Api,
    cache: &ComponentCache,
    matched: &ComponentMatch,
) -> Result<Option<Component>> {
    if let (Some(name), Some(version)) = (&matched.name, &matched.version) {
        if let Some(component) = cache.get(&(name.clone(), version.clone())) {
            return Ok(Some(component.clone()));
        }
        return Ok(Component::filter("name", "eq", name.as_str())
            .filter("version", "eq", version.as_str())
            .filter("active", "eq", "true")
            .first(api)?);
    }
    if let Some(url) = &matched.url {
        return Ok(Component::filter("url", "eq", url.as_str())
            .filter("active", "eq", "true")
            .first(api)?);
    }
    Ok(None)
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("\n{prompt}");
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().read_line(&mut answer)?;
    Ok(matches!(
        answer.trim().to_lowercase().as_str(),
        "y" | "yes" | "true" | "1"
    ))
}

fn cmd_component_requests(api: &Api, states: &[RequestState]) -> Result<()> {
    let states: Vec<String> = if states.is_empty() {
        [
            RequestState::Unprocessed,
            RequestState::Rejected,
            RequestState::Mapped,
        ]
        .iter()
        .map(|state| state.as_str().to_string())
        .collect()
    } else {
        states.iter().map(|state| state.as_str().to_string()).collect()
    };

    for request in ComponentRequest::filter("state", "in", states).iter(api) {
        let request = request?;
        println!(
            "title: {} - {} - {}",
            request.vendor().unwrap_or_default(),
            request.name().unwrap_or_default(),
            request.version().unwrap_or_default()
        );
        println!("URL: {}", request.component_url().unwrap_or_default());
        println!("state: {}", request.state().unwrap_or_default());
        println!();
    }
    Ok(())
}
