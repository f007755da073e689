use std::collections::{BTreeMap, HashMap};
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use impactor_core::{
    AssemblyComposer, CassetteProfile, DEFAULT_CURVE_SIZES_UM, DeviceFamily, MultiStageComposer,
    PhysicsSolver, StageExporter, collection_efficiency, project_name,
};
use impactor_mesh::{DEFAULT_CELL_SIZE_MM, MeshExporter, MeshFormat};
use impactor_sdf::SdfKernel;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

type DynError = Box<dyn Error>;
type Flags = HashMap<String, String>;

/// |Stk(cut-point) - Stk50| accepted by `verify`.
const VERIFY_TOLERANCE: f64 = 0.01;

fn main() -> Result<(), DynError> {
    init_tracing();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    if args.is_empty() {
        print_usage();
        return Ok(());
    }

    match args[0].as_str() {
        "profiles" => run_profiles(),
        "solve" => run_solve(&args[1..]),
        "verify" => run_verify(&args[1..]),
        "stage" => run_stage(&args[1..]),
        "cascade" => run_cascade(&args[1..]),
        _ => {
            print_usage();
            Ok(())
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run_profiles() -> Result<(), DynError> {
    let catalogue: BTreeMap<&str, CassetteProfile> =
        CassetteProfile::catalogue().iter().copied().collect();
    println!("{}", serde_json::to_string_pretty(&catalogue)?);
    Ok(())
}

fn run_solve(args: &[String]) -> Result<(), DynError> {
    let flags = parse_flags(args)?;
    let family = load_family(&flags)?;
    let constraints = PhysicsSolver::default().solve(
        required_f64(&flags, "--flow")?,
        required_f64(&flags, "--cutpoint")?,
        &family.solve_params(),
    )?;
    println!("{}", serde_json::to_string_pretty(&constraints)?);
    Ok(())
}

fn run_verify(args: &[String]) -> Result<(), DynError> {
    let flags = parse_flags(args)?;
    let report = verify_report(&flags)?;
    print!("{report}");
    Ok(())
}

fn verify_report(flags: &Flags) -> Result<String, DynError> {
    let flow = required_f64(flags, "--flow")?;
    let cutpoint = required_f64(flags, "--cutpoint")?;
    let sizes = match flags.get("--sizes") {
        Some(raw) => parse_list(raw, "--sizes")?,
        None => DEFAULT_CURVE_SIZES_UM.to_vec(),
    };
    let family = load_family(flags)?;
    let params = family.solve_params();

    let solver = PhysicsSolver::default();
    let constraints = solver.solve(flow, cutpoint, &params)?;
    let curve = solver.efficiency_curve(flow, &constraints, &params, &sizes)?;
    let stk_at_target =
        solver.stokes_number(flow, constraints.nozzle_diameter_mm, params.nozzle_count, cutpoint)?;

    let mut out = String::new();
    out.push_str(&format!(
        "nozzle diameter {:.4} mm, jet velocity {:.2} m/s, Re {:.0} ({:?})\n",
        constraints.nozzle_diameter_mm,
        constraints.jet_velocity_ms,
        constraints.reynolds_number,
        constraints.reynolds_regime
    ));
    out.push_str("particle (um) | Stokes  | efficiency\n");
    for point in &curve {
        let mark = if point.particle_um == cutpoint { "  <- cut-point" } else { "" };
        out.push_str(&format!(
            "{:>13} | {:.4} | {:6.2} %{mark}\n",
            point.particle_um,
            point.stokes_number,
            point.efficiency * 100.0
        ));
    }

    let verdict = if (stk_at_target - params.stk50).abs() < VERIFY_TOLERANCE {
        "PASS"
    } else {
        "FAIL"
    };
    out.push_str(&format!(
        "{verdict}: Stk at {cutpoint} um is {stk_at_target:.4} (target {}, efficiency {:.1} %)\n",
        params.stk50,
        collection_efficiency(stk_at_target, params.stk50) * 100.0
    ));
    Ok(out)
}

fn run_stage(args: &[String]) -> Result<(), DynError> {
    let flags = parse_flags(args)?;
    let flow = required_f64(&flags, "--flow")?;
    let cutpoint = required_f64(&flags, "--cutpoint")?;
    let output = PathBuf::from(required_str(&flags, "--output")?);
    let default_name = impactor_core::stage_name(0, cutpoint);
    let name = optional_str(&flags, "--name", &default_name);

    let profile = load_profile(&flags)?;
    let composer = build_composer(&flags)?;
    let exporter = build_exporter(&flags)?;

    let stage = composer.compose_stage(&profile, flow, cutpoint, name)?;
    for path in exporter.export_stage(&stage, &output)? {
        println!("{}", path.display());
    }
    Ok(())
}

fn run_cascade(args: &[String]) -> Result<(), DynError> {
    let flags = parse_flags(args)?;
    let flow = required_f64(&flags, "--flow")?;
    let cutpoints = parse_list(required_str(&flags, "--cutpoints")?, "--cutpoints")?;
    let root = PathBuf::from(required_str(&flags, "--output")?);
    let mode = optional_str(&flags, "--mode", "fail-fast");

    let profile = load_profile(&flags)?;
    let composer = build_composer(&flags)?;
    let exporter = build_exporter(&flags)?;
    let multi = MultiStageComposer::new(&composer);

    let written = match mode {
        "fail-fast" => {
            let project = multi.compose_cascade(&profile, flow, &cutpoints)?;
            exporter.export_cascade(&project, &root)?
        }
        "parallel" => {
            let project = multi.compose_cascade_parallel(&profile, flow, &cutpoints)?;
            exporter.export_cascade(&project, &root)?
        }
        "each" => {
            let project_dir = root.join(project_name(flow, &cutpoints));
            let mut written = Vec::new();
            let mut failed = Vec::new();
            for (name, outcome) in multi.compose_cascade_each(&profile, flow, &cutpoints) {
                match outcome {
                    Ok(stage) => {
                        written.extend(exporter.export_stage(&stage, &project_dir.join(&name))?)
                    }
                    Err(err) => {
                        error!(stage = %name, "{err}");
                        failed.push(name);
                    }
                }
            }
            if !failed.is_empty() {
                for path in &written {
                    println!("{}", path.display());
                }
                return Err(format!("stages failed: {}", failed.join(", ")).into());
            }
            written
        }
        other => return Err(format!("unknown cascade mode: {other}").into()),
    };

    info!(files = written.len(), "cascade exported");
    for path in written {
        println!("{}", path.display());
    }
    Ok(())
}

fn load_profile(flags: &Flags) -> Result<CassetteProfile, DynError> {
    if let Some(path) = flags.get("--profile-file") {
        return read_json(path);
    }
    let name = optional_str(flags, "--profile", "standard");
    CassetteProfile::by_name(name).ok_or_else(|| {
        let known: Vec<&str> = CassetteProfile::catalogue().iter().map(|(n, _)| *n).collect();
        format!("unknown profile '{name}', expected one of {}", known.join(", ")).into()
    })
}

fn load_family(flags: &Flags) -> Result<DeviceFamily, DynError> {
    match flags.get("--family-file") {
        Some(path) => read_json(path),
        None => Ok(DeviceFamily::default()),
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, DynError> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)
        .map_err(|err| format!("cannot read {}: {err}", path.display()))?;
    serde_json::from_str(&raw).map_err(|err| format!("invalid JSON in {}: {err}", path.display()).into())
}

fn build_composer(flags: &Flags) -> Result<AssemblyComposer<SdfKernel>, DynError> {
    Ok(AssemblyComposer::new(SdfKernel::new()).with_family(load_family(flags)?))
}

fn build_exporter(flags: &Flags) -> Result<MeshExporter, DynError> {
    let format = optional_str(flags, "--format", "stl").parse::<MeshFormat>()?;
    let cell_size = optional_f64(flags, "--cell-size", DEFAULT_CELL_SIZE_MM)?;
    Ok(MeshExporter::new(cell_size, format)?)
}

fn parse_flags(args: &[String]) -> Result<Flags, DynError> {
    if !args.len().is_multiple_of(2) {
        return Err("expected flag-value pairs".into());
    }

    let mut flags = HashMap::new();
    let mut index = 0;
    while index < args.len() {
        let flag = args[index].as_str();
        if !flag.starts_with("--") {
            return Err(format!("expected flag at position {}", index + 1).into());
        }
        let value = args[index + 1].clone();
        if flags.insert(flag.to_string(), value).is_some() {
            return Err(format!("duplicate flag: {flag}").into());
        }
        index += 2;
    }
    Ok(flags)
}

fn parse_list(raw: &str, key: &str) -> Result<Vec<f64>, DynError> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            item.parse::<f64>()
                .map_err(|err| format!("invalid float '{item}' in {key}: {err}").into())
        })
        .collect()
}

fn required_str<'a>(flags: &'a Flags, key: &str) -> Result<&'a str, DynError> {
    flags
        .get(key)
        .map(String::as_str)
        .ok_or_else(|| format!("missing required {key}").into())
}

fn required_f64(flags: &Flags, key: &str) -> Result<f64, DynError> {
    required_str(flags, key)?
        .parse::<f64>()
        .map_err(|err| format!("invalid float for {key}: {err}").into())
}

fn optional_f64(flags: &Flags, key: &str, default: f64) -> Result<f64, DynError> {
    match flags.get(key) {
        Some(value) => value
            .parse::<f64>()
            .map_err(|err| format!("invalid float for {key}: {err}").into()),
        None => Ok(default),
    }
}

fn optional_str<'a>(flags: &'a Flags, key: &str, default: &'a str) -> &'a str {
    flags.get(key).map(String::as_str).unwrap_or(default)
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  impactor profiles");
    eprintln!("  impactor solve --flow <lpm> --cutpoint <um> [--family-file <path>]");
    eprintln!(
        "  impactor verify --flow <lpm> --cutpoint <um> [--sizes <um,um,...>] [--family-file <path>]"
    );
    eprintln!(
        "  impactor stage --flow <lpm> --cutpoint <um> --output <dir> [--name <str>] [stage options]"
    );
    eprintln!(
        "  impactor cascade --flow <lpm> --cutpoints <um,um,...> --output <dir> [--mode <fail-fast|each|parallel>] [stage options]"
    );
    eprintln!("Stage options:");
    eprintln!("  --profile <standard|miniature> | --profile-file <path>");
    eprintln!("  --family-file <path>");
    eprintln!("  --format <stl|ascii-stl|obj>   --cell-size <mm>");
    eprintln!("Logging is controlled with RUST_LOG (default info).");
}
