// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory FIFO of print jobs with a single lazily started worker.
//
// Jobs run strictly one at a time. Each queue round makes a bounded number
// of print attempts; a job whose round fails goes back to the tail with its
// retry count bumped, until the requeue bound drops it for good. Outcomes
// are broadcast as `JobEvent`s.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use async_trait::async_trait;
use bondrucker_core::config::QueueSettings;
use bondrucker_core::error::{BondruckerError, Result};
use bondrucker_core::repository::OrderRepository;
use bondrucker_core::types::{JobId, Order, OrderId, PrintJob, PrinterConfig};
use tokio::sync::{Notify, broadcast};
use tracing::{debug, error, info, instrument, warn};

use crate::retry::RetryConfig;

const JOB_EVENT_CAPACITY: usize = 64;

/// Whatever can put one order on paper.
#[async_trait]
pub trait JobPrinter: Send + Sync {
    /// Print one copy of `order` on `printer`. `true` on success.
    async fn print(&self, order: &Order, printer: &PrinterConfig) -> bool;
}

/// Outcome of one queue round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobEvent {
    Printed {
        job_id: JobId,
        order_id: OrderId,
        copies: u32,
    },
    Requeued {
        job_id: JobId,
        order_id: OrderId,
        retry_count: u32,
    },
    /// The job left the queue without printing.
    Dropped {
        job_id: JobId,
        order_id: OrderId,
        reason: String,
    },
}

#[derive(Default)]
struct QueueState {
    jobs: VecDeque<PrintJob>,
    worker_active: bool,
}

struct Shared {
    state: Mutex<QueueState>,
    printer: Weak<dyn JobPrinter>,
    orders: Arc<dyn OrderRepository>,
    settings: QueueSettings,
    events: broadcast::Sender<JobEvent>,
    idle: Notify,
}

/// Serialised print queue.
#[derive(Clone)]
pub struct PrintJobQueue {
    shared: Arc<Shared>,
}

impl PrintJobQueue {
    /// Jobs are printed through `printer` for as long as it is alive; orders
    /// not carried inline are looked up in `orders`.
    pub fn new(
        printer: Weak<dyn JobPrinter>,
        orders: Arc<dyn OrderRepository>,
        settings: QueueSettings,
    ) -> Self {
        let (events, _) = broadcast::channel(JOB_EVENT_CAPACITY);
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(QueueState::default()),
                printer,
                orders,
                settings,
                events,
                idle: Notify::new(),
            }),
        }
    }

    /// Append `job` and start the worker if it is not running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn enqueue(&self, job: PrintJob) {
        debug!(job_id = %job.id, order_id = job.order_id, copies = job.copies, "job queued");
        let start_worker = {
            let mut state = self.shared.lock_state();
            state.jobs.push_back(job);
            !std::mem::replace(&mut state.worker_active, true)
        };
        if start_worker {
            let shared = Arc::clone(&self.shared);
            tokio::spawn(async move { shared.run().await });
        }
    }

    /// Jobs waiting, the one being printed excluded.
    pub fn len(&self) -> usize {
        self.shared.lock_state().jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the worker is running.
    pub fn is_busy(&self) -> bool {
        self.shared.lock_state().worker_active
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.shared.events.subscribe()
    }

    /// Resolve once the worker has drained the queue.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.shared.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if !self.is_busy() {
                return;
            }
            notified.await;
        }
    }
}

impl Shared {
    fn lock_state(&self) -> std::sync::MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn run(&self) {
        info!("print worker started");
        loop {
            let next = {
                let mut state = self.lock_state();
                let next = state.jobs.pop_front();
                if next.is_none() {
                    // Cleared under the same lock that saw the queue empty, so a
                    // concurrent enqueue either lands before or spawns a new worker.
                    state.worker_active = false;
                }
                next
            };
            let Some(job) = next else {
                break;
            };
            self.process(job).await;
            tokio::time::sleep(self.settings.inter_job_pause).await;
        }
        self.idle.notify_waiters();
        info!("print worker idle");
    }

    #[instrument(skip_all, fields(job_id = %job.id, order_id = job.order_id, retry = job.retry_count))]
    async fn process(&self, job: PrintJob) {
        let order = match self.resolve_order(&job).await {
            Ok(order) => order,
            Err(e) => {
                warn!(error = %e, "dropping job");
                self.publish(JobEvent::Dropped {
                    job_id: job.id,
                    order_id: job.order_id,
                    reason: e.to_string(),
                });
                return;
            }
        };

        let Some(printer) = self.printer.upgrade() else {
            warn!("printer manager gone, dropping job");
            self.publish(JobEvent::Dropped {
                job_id: job.id,
                order_id: job.order_id,
                reason: "printer manager shut down".into(),
            });
            return;
        };

        let schedule = RetryConfig::fixed(self.settings.attempts_per_round, self.settings.attempt_pause);
        let mut printed = false;
        for attempt in 1..=schedule.max_attempts {
            if printer.print(&order, &job.printer).await {
                printed = true;
                break;
            }
            debug!(attempt, "print attempt failed");
            if let Some(pause) = schedule.delay_after(attempt) {
                tokio::time::sleep(pause).await;
            }
        }

        if printed {
            for copy in 2..=job.copies {
                if !printer.print(&order, &job.printer).await {
                    warn!(copy, copies = job.copies, "extra copy failed");
                }
            }
            info!(copies = job.copies, "job printed");
            self.publish(JobEvent::Printed {
                job_id: job.id,
                order_id: job.order_id,
                copies: job.copies,
            });
        } else if job.retry_count < self.settings.max_requeues {
            let again = job.retried();
            info!(next_retry = again.retry_count, "round failed, requeueing");
            self.publish(JobEvent::Requeued {
                job_id: again.id,
                order_id: again.order_id,
                retry_count: again.retry_count,
            });
            self.lock_state().jobs.push_back(again);
        } else {
            let err = BondruckerError::QueueExhausted {
                order_id: job.order_id,
                rounds: job.retry_count + 1,
            };
            error!(error = %err, "giving up on job");
            self.publish(JobEvent::Dropped {
                job_id: job.id,
                order_id: job.order_id,
                reason: err.to_string(),
            });
        }
    }

    async fn resolve_order(&self, job: &PrintJob) -> Result<Order> {
        if let Some(order) = &job.order {
            return Ok(order.clone());
        }
        self.orders
            .get_order_by_id(job.order_id)
            .await?
            .ok_or(BondruckerError::OrderNotFound(job.order_id))
    }

    fn publish(&self, event: JobEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use bondrucker_core::error::Result;
    use bondrucker_core::repository::NoOrders;
    use bondrucker_core::types::PaperWidth;
    use chrono::Utc;

    use super::*;

    /// Fails the first `failures` prints, then succeeds.
    struct ScriptedPrinter {
        failures: AtomicU32,
        calls: AtomicU32,
        printed: Mutex<Vec<OrderId>>,
    }

    impl ScriptedPrinter {
        fn failing(failures: u32) -> Arc<Self> {
            Arc::new(Self {
                failures: AtomicU32::new(failures),
                calls: AtomicU32::new(0),
                printed: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl JobPrinter for ScriptedPrinter {
        async fn print(&self, order: &Order, _printer: &PrinterConfig) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let left = self.failures.load(Ordering::SeqCst);
            if left > 0 {
                self.failures.store(left - 1, Ordering::SeqCst);
                return false;
            }
            self.printed.lock().expect("lock").push(order.id);
            true
        }
    }

    struct Catalogue(HashMap<OrderId, Order>);

    #[async_trait]
    impl OrderRepository for Catalogue {
        async fn get_order_by_id(&self, id: OrderId) -> Result<Option<Order>> {
            Ok(self.0.get(&id).cloned())
        }

        async fn mark_order_as_printed(&self, _id: OrderId) -> Result<()> {
            Ok(())
        }
    }

    fn order(id: OrderId) -> Order {
        Order {
            id,
            number: id.to_string(),
            created_at: Utc::now(),
            status: String::new(),
            customer_name: String::new(),
            contact_info: String::new(),
            billing_address: String::new(),
            shipping_address: String::new(),
            payment_method: String::new(),
            notes: String::new(),
            items: Vec::new(),
            fee_lines: Vec::new(),
            tax_lines: Vec::new(),
            subtotal: 0.0,
            total_tax: 0.0,
            discount_total: 0.0,
            total: 0.0,
            fulfillment: None,
            is_printed: false,
        }
    }

    fn printer_config() -> PrinterConfig {
        PrinterConfig::bluetooth("Front", "AA:BB:CC:DD:EE:FF", PaperWidth::Mm80)
    }

    fn queue_for(printer: &Arc<ScriptedPrinter>, orders: Arc<dyn OrderRepository>) -> PrintJobQueue {
        let printer: Arc<dyn JobPrinter> = printer.clone();
        PrintJobQueue::new(Arc::downgrade(&printer), orders, QueueSettings::default())
    }

    fn collect(rx: &mut broadcast::Receiver<JobEvent>) -> Vec<JobEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test(start_paused = true)]
    async fn job_prints_with_extra_copies() {
        let printer = ScriptedPrinter::failing(0);
        let queue = queue_for(&printer, Arc::new(NoOrders));
        let mut rx = queue.subscribe();

        queue.enqueue(PrintJob::for_order(order(7), printer_config(), 3));
        queue.wait_idle().await;

        assert_eq!(printer.calls.load(Ordering::SeqCst), 3);
        assert!(matches!(
            collect(&mut rx).as_slice(),
            [JobEvent::Printed { order_id: 7, copies: 3, .. }]
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failure_recovers_within_a_round() {
        let printer = ScriptedPrinter::failing(2);
        let queue = queue_for(&printer, Arc::new(NoOrders));
        let mut rx = queue.subscribe();

        queue.enqueue(PrintJob::for_order(order(8), printer_config(), 1));
        queue.wait_idle().await;

        assert_eq!(printer.calls.load(Ordering::SeqCst), 3);
        assert!(matches!(collect(&mut rx).as_slice(), [JobEvent::Printed { .. }]));
    }

    #[tokio::test(start_paused = true)]
    async fn requeue_is_bounded_then_dropped() {
        let printer = ScriptedPrinter::failing(u32::MAX);
        let queue = queue_for(&printer, Arc::new(NoOrders));
        let mut rx = queue.subscribe();

        queue.enqueue(PrintJob::for_order(order(9), printer_config(), 2));
        queue.wait_idle().await;

        // Four rounds (retry_count 0..=3) of three attempts, no extra copies.
        assert_eq!(printer.calls.load(Ordering::SeqCst), 12);
        let events = collect(&mut rx);
        let retries: Vec<u32> = events
            .iter()
            .filter_map(|e| match e {
                JobEvent::Requeued { retry_count, .. } => Some(*retry_count),
                _ => None,
            })
            .collect();
        assert_eq!(retries, vec![1, 2, 3]);
        assert!(matches!(events.last(), Some(JobEvent::Dropped { order_id: 9, .. })));
        assert!(queue.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn missing_order_is_dropped_without_printing() {
        let printer = ScriptedPrinter::failing(0);
        let queue = queue_for(&printer, Arc::new(NoOrders));
        let mut rx = queue.subscribe();

        queue.enqueue(PrintJob::new(404, printer_config(), 1));
        queue.wait_idle().await;

        assert_eq!(printer.calls.load(Ordering::SeqCst), 0);
        assert!(matches!(
            collect(&mut rx).as_slice(),
            [JobEvent::Dropped { order_id: 404, .. }]
        ));
    }

    struct Offline;

    #[async_trait]
    impl OrderRepository for Offline {
        async fn get_order_by_id(&self, _id: OrderId) -> Result<Option<Order>> {
            Err(BondruckerError::Repository("database is locked".into()))
        }

        async fn mark_order_as_printed(&self, _id: OrderId) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn repository_failure_drops_the_job_with_its_reason() {
        let printer = ScriptedPrinter::failing(0);
        let queue = queue_for(&printer, Arc::new(Offline));
        let mut rx = queue.subscribe();

        queue.enqueue(PrintJob::new(12, printer_config(), 1));
        queue.wait_idle().await;

        assert_eq!(printer.calls.load(Ordering::SeqCst), 0);
        match collect(&mut rx).as_slice() {
            [JobEvent::Dropped { order_id: 12, reason, .. }] => {
                assert!(reason.contains("database is locked"), "{reason}")
            }
            other => panic!("unexpected events: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn orders_are_resolved_by_id_and_printed_in_fifo_order() {
        let catalogue = Catalogue((1..=3).map(|id| (id, order(id))).collect());
        let printer = ScriptedPrinter::failing(0);
        let queue = queue_for(&printer, Arc::new(catalogue));

        for id in 1..=3 {
            queue.enqueue(PrintJob::new(id, printer_config(), 1));
        }
        queue.wait_idle().await;

        assert_eq!(*printer.printed.lock().expect("lock"), vec![1, 2, 3]);
        assert!(!queue.is_busy());
    }

    #[tokio::test(start_paused = true)]
    async fn jobs_are_spaced_by_the_inter_job_pause() {
        let printer = ScriptedPrinter::failing(0);
        let queue = queue_for(&printer, Arc::new(NoOrders));
        let started = tokio::time::Instant::now();

        queue.enqueue(PrintJob::for_order(order(1), printer_config(), 1));
        queue.enqueue(PrintJob::for_order(order(2), printer_config(), 1));
        queue.wait_idle().await;

        assert_eq!(started.elapsed(), Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn wait_idle_returns_immediately_when_nothing_queued() {
        let printer = ScriptedPrinter::failing(0);
        let queue = queue_for(&printer, Arc::new(NoOrders));
        queue.wait_idle().await;
        assert_eq!(queue.len(), 0);
    }
}
