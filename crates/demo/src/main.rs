//! End-to-end walk through the maintenance workflow against the configured
//! state file.

use anyhow::Context as _;
use chrono::{DateTime, Utc};

use fleetmx_context::MaintenanceContext;
use fleetmx_core::{DomainResult, Entity, SystemClock};
use fleetmx_orders::CompletionReport;
use fleetmx_storage::{FileSnapshotStore, Session, StoreConfig};

const TR_001: &str = "TR-001";
const TR_002: &str = "TR-002";

fn main() -> anyhow::Result<()> {
    fleetmx_observability::init();

    let config = StoreConfig::from_env();
    tracing::info!(path = %config.state_path.display(), "opening state");
    let mut session = Session::open(
        FileSnapshotStore::new(&config.state_path),
        SystemClock,
        config.retry_policy(),
    );
    for warning in session.load_warnings() {
        tracing::warn!(%warning, "stored state corrected");
    }

    if session.context().fleet().is_empty() {
        session
            .mutate("seed demo fleet", seed)
            .context("seeding the demo fleet")?;
    }

    session
        .mutate("advance readings", |ctx, _| {
            ctx.update_horometro(TR_001, 550.0)?;
            ctx.update_odometro(TR_001, 52_000.0)?;
            ctx.update_horometro(TR_002, 190.0)?;
            ctx.update_odometro(TR_002, 12_000.0)?;
            Ok(())
        })
        .context("updating readings")?;

    let due = session
        .mutate("check due maintenance", |ctx, now| Ok(ctx.check_due_maintenance(now)))
        .context("checking due maintenance")?;
    println!("\nOrders created:");
    for order in &due {
        println!(
            "asset: {} | component: {} | reason: {} | criticality: {}",
            order.equipment_id(),
            order.component_name(),
            order.reason(),
            order.classification()
        );
    }

    if let Some(first) = due.first() {
        let id = first.id().clone();
        let component = first.component_name().to_string();
        let part = session.context().parts_for_policy(&component).into_iter().next();

        let mut materials: Vec<String> = Vec::new();
        if let Some(name) = part {
            if session.context().get_stock(&name)? > 0 {
                session
                    .mutate("reserve part", |ctx, _| ctx.adjust_stock(&name, -1))
                    .context("reserving spare part")?;
                println!("part '{name}' reserved for order {id}");
                materials.push(name);
            } else {
                println!("not enough stock of part '{name}'");
            }
        }

        session
            .mutate("complete order", |ctx, now| {
                ctx.complete_order(&id, CompletionReport::new().with_materials(materials), now)
            })
            .context("completing order")?;
        println!("order {id} completed for asset {}", first.equipment_id());
    }

    let low = session.context().low_stock_alerts();
    if !low.is_empty() {
        println!("\nParts at minimum level:");
        for name in low {
            println!(" - {name} (current stock: {})", session.context().get_stock(&name)?);
        }
    }

    session
        .mutate("log failures", |ctx, now| {
            ctx.log_failure(TR_001, "Amortiguadores", "shock absorber failure", 3.5, now)?;
            ctx.log_failure(TR_001, "Amortiguadores", "another failure", 2.0, now)?;
            Ok(())
        })
        .context("logging failures")?;

    let ctx = session.context();
    let fmt = |v: Option<f64>| v.map(|v| format!("{v:.1}")).unwrap_or_else(|| "N/A".to_string());
    println!("\nMetrics for {TR_001} (Amortiguadores):");
    println!("MTBF: {} hours", fmt(ctx.calculate_mtbf(TR_001, Some("Amortiguadores"))));
    println!("MTTR: {} hours", fmt(ctx.calculate_mttr(TR_001, Some("Amortiguadores"))));

    let summary = ctx.fleet_summary(session.now().date_naive());
    println!(
        "\nFleet summary: {} (availability {:.1}%)",
        serde_json::to_string(&summary)?,
        summary.availability_pct()
    );
    Ok(())
}

fn seed(ctx: &mut MaintenanceContext, now: DateTime<Utc>) -> DomainResult<()> {
    ctx.add_part("Amortiguador delantero", 10, 2, ["Amortiguadores"])?;
    ctx.add_part("Plumillas limpiaparabrisas", 20, 5, ["Limpiaparabrisas"])?;
    ctx.add_part("Foco delantero", 30, 5, ["Luces"])?;
    ctx.add_asset(TR_001, "Tracto Kalmar", now.date_naive())?;
    ctx.add_asset(TR_002, "Tracto Terberg", now.date_naive())?;
    Ok(())
}
