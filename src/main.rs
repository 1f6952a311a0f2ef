use anyhow::{Context, Result};
use power_flow_solver::config::Config;
use power_flow_solver::domain::{MeasurementSnapshot, Topology};
use power_flow_solver::power_flow::FlowCalculator;
use power_flow_solver::telemetry;
use tracing::{info, warn};

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cfg = Config::load()?;
    telemetry::init_tracing(cfg.engine.debug);

    let topology_text = std::fs::read_to_string(&cfg.input.topology_path)
        .with_context(|| format!("reading topology {}", cfg.input.topology_path.display()))?;
    let topology = Topology::from_toml(&topology_text).context("parsing topology")?;
    topology.validate()?;

    let snapshot_text = std::fs::read_to_string(&cfg.input.snapshot_path)
        .with_context(|| format!("reading snapshot {}", cfg.input.snapshot_path.display()))?;
    let snapshot: MeasurementSnapshot =
        serde_json::from_str(&snapshot_text).context("parsing snapshot")?;

    for entity in snapshot.unparsable() {
        warn!(entity, "unparsable sensor state treated as unknown");
    }

    let mut devices = topology.into_devices(cfg.engine.floor);
    info!(devices = devices.len(), entities = snapshot.len(), "calculating power flows");

    let summary = FlowCalculator::new(cfg.engine.debug).calculate(&mut devices, &snapshot)?;
    for device in summary.unbalanced(0.01) {
        warn!(device = %device.id, residual = device.residual(), "connections do not account for device value");
    }

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
