//! OpsCore sync node entry point.

use std::sync::Arc;

use anyhow::Context as _;
use tracing::info;

use ops_runtime::container::{JournalContext, OpsConfig};
use ops_runtime::wiring;
use ops_telemetry::{init_telemetry, TelemetryConfig};
use shared_types::OperationId;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_telemetry(&TelemetryConfig::from_env()).context("telemetry init failed")?;

    let config = OpsConfig::from_env();
    config.validate().context("invalid configuration")?;
    info!(
        device = %config.device.device_id,
        data_dir = %config.storage.data_dir.display(),
        "starting OpsCore sync node"
    );

    let context = Arc::new(JournalContext::open(config).context("opening event journal")?);

    if let Some(operation) = context.config.operation_id.clone() {
        let operation_id = OperationId::new(operation);
        let applied = context
            .open_operation(operation_id.clone())
            .context("replaying operation log")?;
        info!(operation = %operation_id, events = applied, "operation restored from journal");
        for (table, rows) in context.table_sizes() {
            info!(table, rows, "table restored");
        }
        context
            .sync
            .set_local_presence(context.local_presence(operation_id));
    } else {
        info!("no OC_OPERATION_ID set; waiting for an operation to be created");
    }

    wiring::run(context).await
}
