//! RelayKit CLI
//!
//! Command-line front end for configuring proxy-relay deployments:
//! resolves deployment parameters, materializes configuration files,
//! and exports shareable connection links.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use thiserror::Error;
use tracing::{error, info};

use relaykit_core::{
    replace_file, DeployPaths, DeploymentParameters, ParameterError, TopologyMode,
};
use relaykit_keygen::{generate_short_id, KeyPairOutput, KeyTool, KeygenError};
use relaykit_link::{ConnectionLink, LinkEncoding, LinkError};
use relaykit_resolver::{
    InputProvider, ParameterResolver, ResolveError, ScriptedInput, StdinInput,
};
use relaykit_template::{
    find_tokens, Applied, ConfigDocument, TemplateError, TextTemplate, RELAY_BLOCK,
    RELAY_BLOCK_END, RELAY_BLOCK_START,
};

#[derive(Error, Debug)]
enum CliError {
    #[error(transparent)]
    Parameter(#[from] ParameterError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Link(#[from] LinkError),

    #[error(transparent)]
    Keygen(#[from] KeygenError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Usage(String),
}

impl CliError {
    /// Distinct exit status per error category.
    fn exit_code(&self) -> u8 {
        match self {
            Self::Parameter(_) | Self::Resolve(_) | Self::Usage(_) => 2,
            Self::Template(TemplateError::MissingFile(_)) => 3,
            Self::Template(TemplateError::UnresolvedPlaceholder(_)) => 4,
            Self::Link(_) => 5,
            Self::Keygen(_) => 6,
            Self::Template(_) | Self::Io(_) => 1,
        }
    }
}

type CliResult<T> = std::result::Result<T, CliError>;

/// RelayKit - proxy-relay deployment configurator
#[derive(Parser)]
#[command(name = "relaykit")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve deployment parameters and materialize the config files
    Setup {
        /// Proxy configuration file (JSON document or token template)
        #[arg(long, default_value = "./xray/config/config.json")]
        config: PathBuf,

        /// Reverse-proxy / edge configuration file, when one is deployed
        #[arg(long)]
        edge_config: Option<PathBuf>,

        /// Directory receiving audit records for generated material
        #[arg(long, default_value = ".")]
        audit_dir: PathBuf,

        /// Topology mode; prompted when omitted
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,

        /// Scripted answers for non-interactive runs, in prompt order
        #[arg(long)]
        answer: Vec<String>,

        /// Overwrite values already resolved in the config
        #[arg(long)]
        force: bool,

        /// Skip the external key tool and short-id generation
        #[arg(long)]
        skip_keys: bool,

        /// Key tool command line (first word is the program)
        #[arg(long, default_value = "xray x25519")]
        key_tool: String,

        /// TLS certificate file path baked into the config
        #[arg(long, default_value = "./tls/xray.crt")]
        cert: String,

        /// TLS key file path baked into the config
        #[arg(long, default_value = "./tls/xray.key")]
        key: String,
    },

    /// Export a connection link from the persisted configuration
    Link {
        /// Proxy configuration file
        #[arg(long, default_value = "./xray/config/config.json")]
        config: PathBuf,

        /// Wire encoding; always an explicit choice
        #[arg(long, value_enum)]
        encoding: EncodingArg,

        /// Server address placed in the link
        #[arg(long)]
        address: String,

        /// Server port placed in the link
        #[arg(long, default_value_t = 443)]
        port: u16,

        /// Display name; defaults to the address
        #[arg(long)]
        name: Option<String>,

        /// Also write the link to this file
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Generate key material and record it in the audit directory
    Keys {
        /// Directory receiving the audit records
        #[arg(long, default_value = ".")]
        audit_dir: PathBuf,

        /// Key tool command line (first word is the program)
        #[arg(long, default_value = "xray x25519")]
        key_tool: String,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    Direct,
    Bridge,
    Relay,
}

impl From<ModeArg> for TopologyMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Direct => TopologyMode::Direct,
            ModeArg::Bridge => TopologyMode::Bridge,
            ModeArg::Relay => TopologyMode::Relay,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum EncodingArg {
    Payload,
    Query,
}

impl From<EncodingArg> for LinkEncoding {
    fn from(encoding: EncodingArg) -> Self {
        match encoding {
            EncodingArg::Payload => LinkEncoding::Payload,
            EncodingArg::Query => LinkEncoding::Query,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            eprintln!("Error: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn run(command: Commands) -> CliResult<()> {
    match command {
        Commands::Setup {
            config,
            edge_config,
            audit_dir,
            mode,
            answer,
            force,
            skip_keys,
            key_tool,
            cert,
            key,
        } => {
            let mut paths = DeployPaths::new(config, audit_dir);
            if let Some(edge) = edge_config {
                paths = paths.with_edge_config(edge);
            }
            let mut scripted;
            let mut stdin_input = StdinInput;
            let input: &mut dyn InputProvider = if answer.is_empty() {
                &mut stdin_input
            } else {
                scripted = ScriptedInput::new(answer);
                &mut scripted
            };
            run_setup(&paths, mode, input, force, skip_keys, &key_tool, cert, key)
        }
        Commands::Link {
            config,
            encoding,
            address,
            port,
            name,
            output,
        } => run_link(&config, encoding.into(), address, port, name, output),
        Commands::Keys {
            audit_dir,
            key_tool,
        } => run_keys(&audit_dir, &key_tool),
    }
}

// ============================================================================
// Setup
// ============================================================================

#[allow(clippy::too_many_arguments)]
fn run_setup(
    paths: &DeployPaths,
    mode: Option<ModeArg>,
    input: &mut dyn InputProvider,
    force: bool,
    skip_keys: bool,
    key_tool: &str,
    cert: String,
    key: String,
) -> CliResult<()> {
    let mut params = {
        let mut resolver =
            ParameterResolver::new(input).with_audit_dir(paths.audit_dir.clone());
        let mode = match mode {
            Some(mode) => mode.into(),
            None => resolver.resolve_mode()?,
        };
        resolver.resolve_parameters(mode)?
    };
    params.tls_cert_path = cert;
    params.tls_key_path = key;

    if !skip_keys {
        let (keys, short_id) = generate_key_material(&paths.audit_dir, key_tool)?;
        params.x25519_private_key = keys.private_key;
        params.x25519_public_key = keys.public_key;
        params.short_id = short_id;
    }

    params.validate()?;
    info!("Resolved parameters for {} mode", params.mode);

    apply_config(&paths.config, &params, force, input)?;
    if let Some(edge) = &paths.edge_config {
        apply_config(edge, &params, force, input)?;
    }

    println!("Upstream UUID: {}", params.upstream_id);
    if !params.mode.shares_client_identity() {
        println!("Bridge UUID: {}", params.bridge_id);
    }
    println!("Configuration updated successfully.");
    Ok(())
}

/// Materialize one configuration file.
///
/// A file that still carries placeholder tokens (or is not JSON) goes
/// through the text template path; an already-resolved JSON document
/// goes through the guarded structured path.
fn apply_config(
    path: &Path,
    params: &DeploymentParameters,
    force: bool,
    input: &mut dyn InputProvider,
) -> CliResult<()> {
    let mut template = TextTemplate::load(path)?;

    if template.unresolved_tokens().is_empty() {
        if let Ok(doc) = ConfigDocument::parse(template.content()) {
            return apply_document(path, doc, params, force, input);
        }
    }

    if params.mode.keeps_relay_block() {
        template.strip_block_markers(RELAY_BLOCK_START, RELAY_BLOCK_END);
    } else {
        template.remove_block(RELAY_BLOCK, RELAY_BLOCK_START, RELAY_BLOCK_END)?;
    }
    template.substitute(&params.token_values());
    template.save(path)?;
    info!("Updated {}", path.display());
    Ok(())
}

/// Guarded re-application against an already-resolved JSON config.
///
/// Values that differ from resolved production material are only
/// replaced after explicit confirmation (or `--force`).
fn apply_document(
    path: &Path,
    mut doc: ConfigDocument,
    params: &DeploymentParameters,
    force: bool,
    input: &mut dyn InputProvider,
) -> CliResult<()> {
    if let Applied::WouldReplace { existing } = doc.set_client_id(0, &params.upstream_id, force)? {
        if confirm_replace(input, "client id", &existing, &params.upstream_id)? {
            doc.set_client_id(0, &params.upstream_id, true)?;
        } else {
            info!("Keeping existing client id");
        }
    }

    if !params.outbound_domain.is_empty() {
        match doc.set_outbound_address(0, &params.outbound_domain, force) {
            Ok(Applied::WouldReplace { existing }) => {
                if confirm_replace(input, "outbound address", &existing, &params.outbound_domain)? {
                    doc.set_outbound_address(0, &params.outbound_domain, true)?;
                } else {
                    info!("Keeping existing outbound address");
                }
            }
            Ok(_) => {}
            // upstream-only configs have no outbound target
            Err(TemplateError::MissingField(_)) => {}
            Err(e) => return Err(e.into()),
        }
    }

    if !params.tls_cert_path.is_empty() {
        match doc.set_tls_files(0, &params.tls_cert_path, &params.tls_key_path, force) {
            Ok(Applied::WouldReplace { existing }) => {
                if confirm_replace(input, "TLS files", &existing, &params.tls_cert_path)? {
                    doc.set_tls_files(0, &params.tls_cert_path, &params.tls_key_path, true)?;
                } else {
                    info!("Keeping existing TLS files");
                }
            }
            Ok(_) => {}
            // not every inbound terminates TLS itself
            Err(TemplateError::MissingField(_)) => {}
            Err(e) => return Err(e.into()),
        }
    }

    doc.save(path)?;
    info!("Updated {}", path.display());
    Ok(())
}

fn confirm_replace(
    input: &mut dyn InputProvider,
    field: &str,
    existing: &str,
    new: &str,
) -> CliResult<bool> {
    Ok(input.confirm(&format!("Replace {field} '{existing}' with '{new}'? (y/n)"))?)
}

// ============================================================================
// Link export
// ============================================================================

fn run_link(
    config: &Path,
    encoding: LinkEncoding,
    address: String,
    port: u16,
    name: Option<String>,
    output: Option<PathBuf>,
) -> CliResult<()> {
    let doc = ConfigDocument::load(config)?;
    let id = doc
        .client_id(0)
        .ok_or_else(|| {
            TemplateError::MissingField("inbounds[0].settings.clients[0].id".to_string())
        })?
        .to_string();
    // an unsubstituted placeholder must never leak into a link
    if !find_tokens(&id).is_empty() {
        return Err(TemplateError::UnresolvedPlaceholder(id).into());
    }

    let mut link = ConnectionLink::new(address.clone(), port, id);
    link.name = name.unwrap_or_else(|| address.clone());
    if let Some(network) = doc.stream_network(0) {
        link.network = network.to_string();
    }
    if let Some(security) = doc.stream_security(0) {
        link.security = security.to_string();
    }
    if let Some(ws_path) = doc.ws_path(0) {
        link.path = ws_path.to_string();
    }
    if link.network == "ws" {
        link.host = address;
    }

    let encoded = relaykit_link::encode(&link, encoding)?;
    println!("{encoded}");
    if let Some(output) = output {
        replace_file(&output, &format!("{encoded}\n"))?;
        info!("Wrote link to {}", output.display());
    }
    Ok(())
}

// ============================================================================
// Key material
// ============================================================================

fn run_keys(audit_dir: &Path, key_tool: &str) -> CliResult<()> {
    let (keys, short_id) = generate_key_material(audit_dir, key_tool)?;
    println!("Private key: {}", keys.private_key);
    println!("Public key: {}", keys.public_key);
    println!("Short ID: {short_id}");
    Ok(())
}

fn generate_key_material(audit_dir: &Path, key_tool: &str) -> CliResult<(KeyPairOutput, String)> {
    let tool = parse_key_tool(key_tool)?;
    let keys = tool.generate()?;
    let short_id = generate_short_id();

    fs::create_dir_all(audit_dir)?;
    replace_file(
        &audit_dir.join("x25519_keys.txt"),
        &format!(
            "Private key: {}\nPublic key: {}\n",
            keys.private_key, keys.public_key
        ),
    )?;
    replace_file(&audit_dir.join("short_id.txt"), &format!("{short_id}\n"))?;
    info!("Recorded key material under {}", audit_dir.display());
    Ok((keys, short_id))
}

fn parse_key_tool(command: &str) -> CliResult<KeyTool> {
    let mut parts = command.split_whitespace();
    let program = parts
        .next()
        .ok_or_else(|| CliError::Usage("empty key tool command".to_string()))?;
    let mut tool = KeyTool::new(program);
    for arg in parts {
        tool = tool.arg(arg);
    }
    Ok(tool)
}
