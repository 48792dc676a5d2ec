//! Departure marker CLI: `dmark` command.
//!
//! Generates keys, runs departure ceremonies, verifies and witnesses
//! markers, builds batch exits, and manages pre-rotated key event logs.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use departure_marker::batch::BatchExit;
use departure_marker::crypto::encryption::KdfParams;
use departure_marker::keylog::{KeyEventLog, KeyStatus, RotationReason};
use departure_marker::marker::expiry;
use departure_marker::storage::{
    load_keys, load_log, read_key_file, save_keys, FileMarkerStore, KeyLogStore, MarkerStore,
    StoredKeys,
};
use departure_marker::{
    canonical, is_key_compromised, verify_marker_json_with, verify_witness_with, witness_marker,
    Algorithm, CeremonyStateMachine, DepartureMarker, DepartureType, KeyPair, LogTelemetry,
    MarkerBuilder, PreRotatedIdentity, Signer, Standing, WitnessAttestation,
};

/// Environment variable consulted before prompting for a passphrase.
const PASSPHRASE_ENV: &str = "DEPARTURE_PASSPHRASE";
const HOME_ENV: &str = "DEPARTURE_HOME";

// ── Directory helpers ─────────────────────────────────────────────────────────

struct Home {
    root: PathBuf,
}

impl Home {
    fn resolve(flag: Option<PathBuf>) -> Result<Self> {
        let root = match flag {
            Some(dir) => dir,
            None => match std::env::var_os(HOME_ENV) {
                Some(dir) => PathBuf::from(dir),
                None => {
                    let home = std::env::var_os("HOME")
                        .ok_or_else(|| anyhow!("HOME not set; pass --home or set {HOME_ENV}"))?;
                    PathBuf::from(home).join(".departure")
                }
            },
        };
        log::debug!("state directory {}", root.display());
        Ok(Self { root })
    }

    fn key_path(&self, name: &str) -> PathBuf {
        self.root.join("keys").join(format!("{name}.dmk"))
    }

    fn markers(&self) -> Result<FileMarkerStore> {
        FileMarkerStore::new(self.root.join("markers")).context("failed to open marker store")
    }

    fn keylogs(&self) -> Result<KeyLogStore> {
        KeyLogStore::new(self.root.join("keylogs")).context("failed to open key log store")
    }
}

// ── Passphrase helper ─────────────────────────────────────────────────────────

fn read_passphrase(prompt: &str) -> Result<String> {
    if let Ok(passphrase) = std::env::var(PASSPHRASE_ENV) {
        return Ok(passphrase);
    }
    eprint!("{prompt}");
    let mut passphrase = String::new();
    std::io::stdin()
        .read_line(&mut passphrase)
        .context("failed to read passphrase")?;
    Ok(passphrase.trim_end_matches(['\r', '\n']).to_string())
}

fn unlock(home: &Home, key_name: &str) -> Result<StoredKeys> {
    let path = home.key_path(key_name);
    if !path.exists() {
        bail!("key '{key_name}' not found; run `dmark keygen` first");
    }
    let passphrase = read_passphrase(&format!("Passphrase for key '{key_name}': "))?;
    load_keys(&path, &passphrase).context("failed to load key (wrong passphrase?)")
}

// ── File helpers ──────────────────────────────────────────────────────────────

fn read_marker(path: &Path) -> Result<DepartureMarker> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    DepartureMarker::from_json(&json).with_context(|| format!("{} is not a marker", path.display()))
}

fn emit(json: &str, out: Option<&Path>) -> Result<()> {
    match out {
        Some(path) => std::fs::write(path, format!("{json}\n"))
            .with_context(|| format!("failed to write {}", path.display())),
        None => {
            println!("{json}");
            Ok(())
        }
    }
}

/// The stored log whose current keys include `did`.
fn find_log(store: &KeyLogStore, did: &str) -> Result<Option<KeyEventLog>> {
    for identifier in store.list()? {
        let log = store
            .load(&identifier)
            .with_context(|| format!("key log {identifier} failed to replay"))?;
        if log.state().keys.iter().any(|k| k == did) {
            return Ok(Some(log));
        }
    }
    Ok(None)
}

// ── CLI structure ─────────────────────────────────────────────────────────────

/// Departure marker CLI: signed, verifiable records of an agent leaving a
/// platform.
#[derive(Parser, Debug)]
#[command(
    name = "dmark",
    about = "Departure marker CLI",
    version,
    long_about = "dmark: Departure marker CLI\n\nRun exit ceremonies, verify and witness markers,\nbatch mass departures, and manage pre-rotated key logs."
)]
struct Cli {
    /// State directory (default: $DEPARTURE_HOME, then ~/.departure)
    #[arg(long, global = true)]
    home: Option<PathBuf>,

    /// Key to use (default: default)
    #[arg(long, global = true, default_value = "default")]
    key: String,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a signing key
    Keygen {
        /// ed25519 or p256
        #[arg(long, default_value = "ed25519")]
        algorithm: String,

        /// Overwrite an existing key file
        #[arg(long)]
        force: bool,

        /// Argon2id memory cost in KiB
        #[arg(long, default_value_t = 65536)]
        kdf_memory: u32,
    },

    /// Print the DID of a key
    Did,

    /// Run a departure ceremony and emit the signed marker
    Create {
        /// Platform being left (URI)
        #[arg(long)]
        origin: String,

        /// Departure type: voluntary, forced, emergency, keyCompromise,
        /// platformShutdown, directed, constructive, acquisition
        #[arg(long, default_value = "voluntary")]
        r#type: String,

        /// Ceremony path (default: emergency for emergency departures,
        /// cooperative otherwise)
        #[arg(long, value_enum)]
        path: Option<PathArg>,

        /// Departing subject (default: the key's DID)
        #[arg(long)]
        subject: Option<String>,

        #[arg(long)]
        standing: Option<String>,

        /// Required for emergency departures
        #[arg(long)]
        justification: Option<String>,

        /// RFC 3339 expiry
        #[arg(long)]
        expires: Option<String>,

        /// Write the marker here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,

        /// Do not copy the marker into the marker store
        #[arg(long)]
        no_store: bool,
    },

    /// Verify a marker file
    Verify {
        file: PathBuf,

        /// Key log file to check the signing key against
        #[arg(long)]
        keylog: Option<PathBuf>,

        /// Witness attestation files to verify alongside
        #[arg(long)]
        witness: Vec<PathBuf>,
    },

    /// Print the content address of a marker file
    Id { file: PathBuf },

    /// Co-sign a marker as a witness
    Witness {
        file: PathBuf,

        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Commit many markers to one Merkle root
    Batch {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Sign the root with the selected key
        #[arg(long)]
        sign: bool,

        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Manage the key event log
    Kel {
        #[command(subcommand)]
        subcommand: KelCommands,
    },
}

#[derive(Subcommand, Debug)]
enum KelCommands {
    /// Start a log for the selected key, reserving a next key
    Incept,

    /// Rotate to the reserved key
    Rotate {
        /// scheduled, compromised, device-lost, or manual
        #[arg(long)]
        reason: Option<String>,
    },

    /// Show the log for the selected key
    Show,

    /// Replay a log file
    Check { file: PathBuf },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PathArg {
    Cooperative,
    Unilateral,
    Contested,
    Emergency,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    let verbose = cli.verbose;
    let key = cli.key.clone();

    let result = Home::resolve(cli.home).and_then(|home| match cli.command {
        Commands::Keygen {
            algorithm,
            force,
            kdf_memory,
        } => cmd_keygen(&home, &key, &algorithm, force, kdf_memory, verbose),
        Commands::Did => cmd_did(&home, &key, verbose),
        Commands::Create {
            origin,
            r#type,
            path,
            subject,
            standing,
            justification,
            expires,
            out,
            no_store,
        } => cmd_create(
            &home,
            &key,
            CreateArgs {
                origin,
                departure_type: r#type,
                path,
                subject,
                standing,
                justification,
                expires,
                out,
                store: !no_store,
            },
            verbose,
        ),
        Commands::Verify {
            file,
            keylog,
            witness,
        } => cmd_verify(&file, keylog.as_deref(), &witness, verbose),
        Commands::Id { file } => cmd_id(&file, verbose),
        Commands::Witness { file, out } => cmd_witness(&home, &key, &file, out.as_deref()),
        Commands::Batch { files, sign, out } => {
            cmd_batch(&home, &key, &files, sign, out.as_deref(), verbose)
        }
        Commands::Kel { subcommand } => match subcommand {
            KelCommands::Incept => cmd_kel_incept(&home, &key, verbose),
            KelCommands::Rotate { reason } => {
                cmd_kel_rotate(&home, &key, reason.as_deref(), verbose)
            }
            KelCommands::Show => cmd_kel_show(&home, &key, verbose),
            KelCommands::Check { file } => cmd_kel_check(&file),
        },
    });

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

// ── Command implementations ───────────────────────────────────────────────────

/// `dmark keygen [--algorithm ALG] [--force]`
fn cmd_keygen(
    home: &Home,
    name: &str,
    algorithm: &str,
    force: bool,
    kdf_memory: u32,
    verbose: bool,
) -> Result<()> {
    let algorithm: Algorithm = algorithm.parse()?;
    let path = home.key_path(name);
    if path.exists() && !force {
        bail!(
            "key '{name}' already exists at {} (use --force to replace)",
            path.display()
        );
    }

    let passphrase = read_passphrase("Enter passphrase for new key: ")?;
    if passphrase.is_empty() {
        bail!("passphrase cannot be empty");
    }
    if std::env::var_os(PASSPHRASE_ENV).is_none() {
        let confirm = read_passphrase("Confirm passphrase: ")?;
        if passphrase != confirm {
            bail!("passphrases do not match");
        }
    }

    let kdf = KdfParams {
        m_cost: kdf_memory,
        ..KdfParams::default()
    };
    let key = KeyPair::generate(algorithm);
    let did = key.did();
    save_keys(&path, &StoredKeys::single(key), &passphrase, kdf)
        .context("failed to save key")?;

    println!("Created {algorithm} key '{name}'");
    println!("  DID:  {did}");
    println!("  File: {}", path.display());
    if verbose {
        println!("  KDF:  argon2id m={} t={} p={}", kdf.m_cost, kdf.t_cost, kdf.p_cost);
    }
    Ok(())
}

/// `dmark did`
fn cmd_did(home: &Home, name: &str, verbose: bool) -> Result<()> {
    let header = read_key_file(&home.key_path(name))
        .with_context(|| format!("failed to read key '{name}'"))?;
    println!("{}", header.did);
    if verbose {
        println!("  Algorithm: {}", header.algorithm);
        match header.next_key_digest {
            Some(digest) => println!("  Next key digest: {digest}"),
            None => println!("  Next key: none reserved"),
        }
    }
    Ok(())
}

struct CreateArgs {
    origin: String,
    departure_type: String,
    path: Option<PathArg>,
    subject: Option<String>,
    standing: Option<String>,
    justification: Option<String>,
    expires: Option<String>,
    out: Option<PathBuf>,
    store: bool,
}

/// `dmark create --origin URI [--type T] [--path P] ...`
fn cmd_create(home: &Home, name: &str, args: CreateArgs, verbose: bool) -> Result<()> {
    let departure_type: DepartureType = args.departure_type.parse()?;
    let path = args.path.unwrap_or(if departure_type == DepartureType::Emergency {
        PathArg::Emergency
    } else {
        PathArg::Cooperative
    });
    if matches!(path, PathArg::Emergency) != (departure_type == DepartureType::Emergency) {
        bail!("--path emergency and --type emergency must be used together");
    }

    let keys = unlock(home, name)?;
    let signer = &keys.current;
    let subject = args.subject.unwrap_or_else(|| signer.did());

    let mut builder = MarkerBuilder::new(subject.clone(), args.origin.clone(), departure_type);
    if let Some(standing) = &args.standing {
        builder = builder.standing(standing.parse::<Standing>()?);
    }
    if let Some(justification) = args.justification {
        builder = builder.emergency_justification(justification);
    }
    if let Some(expires) = args.expires {
        builder = builder.expires(expires);
    }
    let unsigned = builder.build().context("marker failed validation")?;

    let mut ceremony = CeremonyStateMachine::with_telemetry(Arc::new(LogTelemetry));
    ceremony.declare_intent(&subject, &args.origin, departure_type, signer)?;
    match path {
        PathArg::Emergency => {}
        PathArg::Cooperative => ceremony.snapshot()?,
        PathArg::Unilateral => {
            ceremony.snapshot()?;
            ceremony.open_challenge()?;
        }
        PathArg::Contested => {
            ceremony.snapshot()?;
            ceremony.open_challenge()?;
            ceremony.contest()?;
        }
    }
    ceremony.sign_marker(&unsigned, signer)?;
    let marker = ceremony.depart()?;

    if args.store {
        home.markers()?.save(&marker).context("failed to store marker")?;
    }
    emit(&marker.to_json_pretty()?, args.out.as_deref())?;

    if verbose {
        let states: Vec<String> = ceremony.history().iter().map(|s| s.to_string()).collect();
        eprintln!("ceremony: {}", states.join(" -> "));
        if let Some(path) = ceremony.path() {
            eprintln!("path:     {path}");
        }
        eprintln!("id:       {}", marker.id);
    }
    Ok(())
}

/// `dmark verify FILE [--keylog LOG] [--witness FILE ...]`
fn cmd_verify(
    file: &Path,
    keylog: Option<&Path>,
    witnesses: &[PathBuf],
    verbose: bool,
) -> Result<()> {
    let json = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let result = verify_marker_json_with(&json, &LogTelemetry);
    println!("{}: {result}", file.display());
    if !result.valid {
        bail!("marker failed verification");
    }
    let marker = DepartureMarker::from_json(&json)?;

    let mut failed = false;
    if let Some(log_path) = keylog {
        let log = load_log(log_path).context("key log failed to replay")?;
        if is_key_compromised(log.state(), &marker) {
            let status = log.state().key_status(marker.proof.signer_did());
            println!("  signing key not current in {}: {status:?}", log.identifier());
            failed = true;
        } else {
            println!("  signing key current in {}", log.identifier());
        }
    }

    for path in witnesses {
        let attestation: WitnessAttestation = serde_json::from_str(
            &std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?,
        )
        .with_context(|| format!("{} is not a witness attestation", path.display()))?;
        let check = verify_witness_with(&marker, &attestation, &LogTelemetry);
        println!("  witness {}: {check}", attestation.witness);
        failed |= !check.valid;
    }

    if verbose {
        let expires_at = expiry::effective_expiry(&marker)?;
        let expired = expiry::is_expired(&marker, chrono::Utc::now())?;
        println!(
            "  expires {}{}",
            expires_at.to_rfc3339(),
            if expired { " (expired)" } else { "" }
        );
    }

    if failed {
        bail!("marker verified but a supporting check failed");
    }
    Ok(())
}

/// `dmark id FILE`
fn cmd_id(file: &Path, verbose: bool) -> Result<()> {
    let marker = read_marker(file)?;
    let id = canonical::compute_id(&marker)?;
    println!("{id}");
    if verbose && !marker.id.is_empty() && marker.id != id {
        eprintln!("declared id {} does not match", marker.id);
    }
    Ok(())
}

/// `dmark witness FILE [--out FILE]`
fn cmd_witness(home: &Home, name: &str, file: &Path, out: Option<&Path>) -> Result<()> {
    let marker = read_marker(file)?;
    let keys = unlock(home, name)?;
    let attestation = witness_marker(&marker, &keys.current).context("failed to witness")?;
    emit(&serde_json::to_string_pretty(&attestation)?, out)
}

/// `dmark batch FILE... [--sign] [--out FILE]`
fn cmd_batch(
    home: &Home,
    name: &str,
    files: &[PathBuf],
    sign: bool,
    out: Option<&Path>,
    verbose: bool,
) -> Result<()> {
    let markers = files
        .iter()
        .map(|f| read_marker(f.as_path()))
        .collect::<Result<Vec<_>>>()?;
    let mut batch = BatchExit::build(&markers)?;
    if sign {
        let keys = unlock(home, name)?;
        batch.sign(&keys.current)?;
    }
    let proofs = (0..batch.len())
        .map(|i| batch.proof_at(i))
        .collect::<departure_marker::Result<Vec<_>>>()?;

    let doc = serde_json::json!({ "batch": batch, "proofs": proofs });
    emit(&serde_json::to_string_pretty(&doc)?, out)?;
    if verbose {
        eprintln!("{} markers, root {}", batch.len(), batch.root);
    }
    Ok(())
}

/// `dmark kel incept`
fn cmd_kel_incept(home: &Home, name: &str, verbose: bool) -> Result<()> {
    let path = home.key_path(name);
    let header = read_key_file(&path)?;
    let store = home.keylogs()?;
    if let Some(log) = find_log(&store, &header.did)? {
        bail!("key '{name}' already has log {}", log.identifier());
    }

    let passphrase = read_passphrase(&format!("Passphrase for key '{name}': "))?;
    let keys = load_keys(&path, &passphrase).context("failed to load key (wrong passphrase?)")?;
    let next = KeyPair::generate(keys.current.algorithm());
    let identity = PreRotatedIdentity::from_parts(keys.current, next)?;
    let (current, next, log) = identity.into_parts();

    store.save(&log).context("failed to save key log")?;
    let stored = StoredKeys {
        current,
        next: Some(next),
    };
    save_keys(&path, &stored, &passphrase, header.encryption.kdf_params)
        .context("failed to save key with reserved next key")?;

    println!("Incepted key log {}", log.identifier());
    if verbose {
        println!("  File: {}", store.path_for(log.identifier())?.display());
        println!("  Next key digest: {}", log.state().next_key_digests.join(", "));
    }
    Ok(())
}

/// `dmark kel rotate [--reason R]`
fn cmd_kel_rotate(home: &Home, name: &str, reason: Option<&str>, verbose: bool) -> Result<()> {
    let reason = reason.map(str::parse::<RotationReason>).transpose()?;
    let path = home.key_path(name);
    let header = read_key_file(&path)?;
    let store = home.keylogs()?;
    let log = find_log(&store, &header.did)?
        .ok_or_else(|| anyhow!("key '{name}' has no key log; run `dmark kel incept` first"))?;

    let passphrase = read_passphrase(&format!("Passphrase for key '{name}': "))?;
    let keys = load_keys(&path, &passphrase).context("failed to load key (wrong passphrase?)")?;
    let next = keys
        .next
        .ok_or_else(|| anyhow!("key '{name}' holds no reserved next key"))?;
    let old_did = keys.current.did();

    let mut identity = PreRotatedIdentity::resume(log, keys.current, next)?;
    identity.rotate(reason)?;
    let (current, next, log) = identity.into_parts();

    store.save(&log).context("failed to save key log")?;
    let new_did = current.did();
    let stored = StoredKeys {
        current,
        next: Some(next),
    };
    save_keys(&path, &stored, &passphrase, header.encryption.kdf_params)
        .context("failed to save rotated key")?;

    println!("Rotated key '{name}' (sequence {})", log.state().sequence);
    println!("  Old DID: {old_did}");
    println!("  New DID: {new_did}");
    if verbose {
        if let Some(reason) = reason {
            println!("  Reason:  {}", reason.as_str());
        }
    }
    Ok(())
}

/// `dmark kel show`
fn cmd_kel_show(home: &Home, name: &str, verbose: bool) -> Result<()> {
    let header = read_key_file(&home.key_path(name))?;
    let store = home.keylogs()?;
    let log = find_log(&store, &header.did)?
        .ok_or_else(|| anyhow!("key '{name}' has no key log"))?;
    print_state(&log, &header.did);
    if verbose {
        println!("{}", serde_json::to_string_pretty(log.events())?);
    }
    Ok(())
}

/// `dmark kel check FILE`
fn cmd_kel_check(file: &Path) -> Result<()> {
    let log = load_log(file).context("key log failed to replay")?;
    println!("{}: valid", file.display());
    print_state(&log, "");
    Ok(())
}

fn print_state(log: &KeyEventLog, did: &str) {
    let state = log.state();
    println!("Key log {}", state.identifier);
    println!("  Events:   {}", log.len());
    println!("  Sequence: {}", state.sequence);
    for key in &state.keys {
        println!("  Key:      {key}");
    }
    for digest in &state.next_key_digests {
        println!("  Next:     {digest}");
    }
    if !state.retired.is_empty() {
        println!("  Retired:  {}", state.retired.len());
    }
    if !did.is_empty() && state.key_status(did) != KeyStatus::Current {
        println!("  warning: {did} is not a current key");
    }
}
