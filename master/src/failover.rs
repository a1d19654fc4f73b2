use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::warn;

use crate::scheduler::Scheduler;

/// Loop del reaper: no hay heartbeats, la caída o el cuelgue de un worker se
/// infiere sólo porque su lease venció.
pub async fn run_failover_loop(scheduler: Arc<Scheduler>, every: Duration) {
    loop {
        sleep(every).await;
        sweep_once(&scheduler);
    }
}

/// Una pasada de chequeo:
/// 1. vuelve a Idle las tareas con lease vencido
/// 2. revoca la identidad de sus dueños
/// Devuelve cuántas tareas se recuperaron.
pub fn sweep_once(scheduler: &Scheduler) -> usize {
    let expired = scheduler.check_leases();

    for e in &expired {
        match e.owner {
            Some(owner) => warn!(
                "lease vencido: tarea {} {} vuelve a idle, worker {} revocado (timeout {:?})",
                e.phase,
                e.task_id,
                owner,
                scheduler.lease_timeout()
            ),
            None => warn!("lease vencido: tarea {} {} vuelve a idle", e.phase, e.task_id),
        }
    }

    expired.len()
}
