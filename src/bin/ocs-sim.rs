use std::path::PathBuf;
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use ocs_reencrypt::client::{decrypt_point, encrypt_point, ClientKeypair};
use ocs_reencrypt::cluster::{Fault, LocalCluster, ROOT};
use ocs_reencrypt::config::ProtocolConfig;
use ocs_reencrypt::curve::{generator, point_to_bytes, scalar_random};
use ocs_reencrypt::types::{Error, NodeId};
use ocs_reencrypt::{Outcome, PolicyHook, ReencryptRequest};
use rand_core::OsRng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
struct ShareJson {
    index: u32,
    value_b64: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct SimulationReport {
    request: String,
    roster_size: usize,
    threshold: usize,
    success: bool,
    failure: Option<String>,
    shares: Vec<ShareJson>,
    secret_recovered: bool,
    messages_sent: usize,
    events_handled: usize,
}

#[derive(Debug, Serialize, Deserialize)]
struct ThresholdReport {
    roster_size: usize,
    threshold: usize,
    fault_tolerance: usize,
}

fn main() {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    if args.is_empty() {
        usage();
        return;
    }
    let cmd = &args[0];
    let rest = &args[1..];

    let res = match cmd.as_str() {
        "simulate" => cmd_simulate(rest),
        "threshold" => cmd_threshold(rest),
        _ => {
            usage();
            Ok(())
        }
    };
    if let Err(err) = res {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn usage() {
    eprintln!("ocs-sim <cmd> [args]\n");
    eprintln!("Commands:");
    eprintln!("  simulate [--config <file>] [--n <n>] [--refuse <id,id,..>] [--offline <id,..>]");
    eprintln!("           [--unreachable <id,..>] [--tamper <id,..>] [--deny-root] [--log <filter>]");
    eprintln!("  threshold --n <n>");
}

fn load_config(args: &[String]) -> Result<ProtocolConfig, Error> {
    match get_path(args, "--config") {
        Some(path) => ProtocolConfig::load(&path),
        None => ProtocolConfig::new(get_u32(args, "--n").unwrap_or(4) as usize),
    }
}

fn cmd_threshold(args: &[String]) -> Result<(), Error> {
    let config = load_config(args)?;
    let report = ThresholdReport {
        roster_size: config.roster_size,
        threshold: config.threshold(),
        fault_tolerance: config.fault_tolerance(),
    };
    print_json(&report)
}

fn cmd_simulate(args: &[String]) -> Result<(), Error> {
    let config = load_config(args)?;
    let filter = get_str(args, "--log").or_else(|| config.log_filter.clone());
    ocs_reencrypt::logging::init_tracing(filter.as_deref());

    let mut rng = OsRng;
    let mut cluster = LocalCluster::new(config.clone(), &mut rng)?;
    let refuse: PolicyHook = Arc::new(|_: &ReencryptRequest| false);
    for id in parse_id_list(&get_str(args, "--refuse").unwrap_or_default()) {
        cluster = cluster.with_policy(id, refuse.clone());
    }
    if has_flag(args, "--deny-root") {
        cluster = cluster.with_policy(ROOT, refuse.clone());
    }
    for (key, fault) in [
        ("--offline", Fault::Offline),
        ("--unreachable", Fault::Unreachable),
        ("--tamper", Fault::Tampered),
    ] {
        for id in parse_id_list(&get_str(args, key).unwrap_or_default()) {
            cluster = cluster.with_fault(id, fault);
        }
    }

    let group_key = cluster.commitment().public_key();
    let secret = generator() * scalar_random(&mut rng);
    let ciphertext = encrypt_point(&group_key, &secret, &mut rng);
    let client = ClientKeypair::random(&mut rng);
    let request = ReencryptRequest::new(ciphertext.u, client.public);
    let request_id = request.id();

    let report = cluster.run(request, &mut rng)?;
    let (success, failure, secret_recovered) = match &report.outcome {
        Outcome::Reencrypted { shares } => {
            let recovered =
                decrypt_point(&client, &group_key, &ciphertext, shares, config.threshold())?;
            (true, None, recovered == secret)
        }
        Outcome::Failed(reason) => (false, Some(format!("{reason:?}")), false),
    };
    let shares = report
        .outcome
        .shares()
        .iter()
        .map(|s| ShareJson {
            index: s.index,
            value_b64: STANDARD.encode(point_to_bytes(&s.value)),
        })
        .collect();
    print_json(&SimulationReport {
        request: request_id.to_string(),
        roster_size: config.roster_size,
        threshold: config.threshold(),
        success,
        failure,
        shares,
        secret_recovered,
        messages_sent: report.messages_sent,
        events_handled: report.events_handled,
    })
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Error> {
    let json = serde_json::to_string_pretty(value).map_err(|e| Error::Config(e.to_string()))?;
    println!("{json}");
    Ok(())
}

fn parse_id_list(s: &str) -> Vec<NodeId> {
    s.split(',')
        .filter_map(|part| part.trim().parse::<u32>().ok())
        .collect()
}

fn has_flag(args: &[String], key: &str) -> bool {
    args.iter().any(|a| a == key)
}

fn get_u32(args: &[String], key: &str) -> Option<u32> {
    get_str(args, key).and_then(|v| v.parse().ok())
}

fn get_str(args: &[String], key: &str) -> Option<String> {
    args.iter()
        .position(|a| a == key)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn get_path(args: &[String], key: &str) -> Option<PathBuf> {
    get_str(args, key).map(PathBuf::from)
}
