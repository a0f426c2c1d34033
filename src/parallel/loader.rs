use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use crossbeam::channel::{bounded, Receiver};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use tracing::{debug, info};
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{LocationBatch, UserBatch, VisitBatch};
use crate::parallel::bundle::{Bundle, Member, MemberKind};
use crate::storage::store::Store;

/// Fills the store from a dataset bundle before serving starts.
///
/// One producer thread streams members into a bounded queue; `workers`
/// threads from a dedicated rayon pool decode and insert them. `load` returns
/// only after every worker has drained the queue, and fails as a whole on the
/// first decode error.
pub struct BulkLoader {
    pub store: Arc<Store>,
    pub workers: usize,
    pub queue: usize,
}

#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub members: usize,
    pub users: usize,
    pub locations: usize,
    pub visits: usize,
    pub elapsed: Duration,
}

#[derive(Default)]
struct LoadCounters {
    members: AtomicUsize,
    users: AtomicUsize,
    locations: AtomicUsize,
    visits: AtomicUsize,
}

impl BulkLoader {
    pub fn new(store: Arc<Store>, workers: usize) -> Self {
        BulkLoader {
            store,
            workers: workers.max(1),
            queue: workers.max(1),
        }
    }

    pub fn with_queue(mut self, queue: usize) -> Self {
        self.queue = queue.max(1);
        self
    }

    pub fn load(&self, bundle: &Bundle) -> Result<LoadReport> {
        let started = Instant::now();

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|i| format!("loader-{}", i))
            .build()
            .map_err(|e| Error::new(ErrorKind::Internal, format!("Cannot start loader pool: {}", e)))?;

        let (sender, receiver) = bounded::<Member>(self.queue);
        let counters = LoadCounters::default();
        let failed = AtomicBool::new(false);
        let failure: Mutex<Option<Error>> = Mutex::new(None);

        let streamed = thread::scope(|scope| {
            let producer = scope.spawn(move || bundle.stream(&sender));

            pool.scope(|s| {
                for _ in 0..self.workers {
                    let receiver = receiver.clone();
                    let (counters, failed, failure) = (&counters, &failed, &failure);
                    s.spawn(move |_| self.drain(receiver, counters, failed, failure));
                }
            });

            // Unblocks the producer if workers stopped early
            drop(receiver);

            producer.join().unwrap_or_else(|_| {
                Err(Error::new(ErrorKind::Internal, "Bundle reader panicked".to_string()))
            })
        });

        if let Some(err) = failure.into_inner() {
            return Err(err);
        }
        let streamed = streamed?;

        let report = LoadReport {
            members: counters.members.load(Ordering::Relaxed),
            users: counters.users.load(Ordering::Relaxed),
            locations: counters.locations.load(Ordering::Relaxed),
            visits: counters.visits.load(Ordering::Relaxed),
            elapsed: started.elapsed(),
        };

        info!(
            bundle = %bundle.path().display(),
            streamed,
            users = report.users,
            locations = report.locations,
            visits = report.visits,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Dataset loaded"
        );

        Ok(report)
    }

    fn drain(
        &self,
        receiver: Receiver<Member>,
        counters: &LoadCounters,
        failed: &AtomicBool,
        failure: &Mutex<Option<Error>>,
    ) {
        for member in receiver.iter() {
            if failed.load(Ordering::Acquire) {
                break;
            }

            if let Err(err) = self.ingest(&member, counters) {
                failed.store(true, Ordering::Release);
                failure.lock().get_or_insert(err);
                break;
            }
        }
    }

    fn ingest(&self, member: &Member, counters: &LoadCounters) -> Result<()> {
        let Some(kind) = MemberKind::classify(&member.name) else {
            debug!(member = %member.name, "Skipping unrecognised bundle member");
            return Ok(());
        };

        let started = Instant::now();
        let records = match kind {
            MemberKind::Users => {
                let batch: UserBatch = decode_member(member)?;
                for user in &batch.users {
                    self.store.load_user(user)?;
                }
                counters.users.fetch_add(batch.users.len(), Ordering::Relaxed);
                batch.users.len()
            }
            MemberKind::Locations => {
                let batch: LocationBatch = decode_member(member)?;
                for location in &batch.locations {
                    self.store.load_location(location)?;
                }
                counters.locations.fetch_add(batch.locations.len(), Ordering::Relaxed);
                batch.locations.len()
            }
            MemberKind::Visits => {
                let batch: VisitBatch = decode_member(member)?;
                for visit in &batch.visits {
                    self.store.load_visit(visit)?;
                }
                counters.visits.fetch_add(batch.visits.len(), Ordering::Relaxed);
                batch.visits.len()
            }
        };
        counters.members.fetch_add(1, Ordering::Relaxed);

        info!(
            member = %member.name,
            kind = ?kind,
            records,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Member processed"
        );
        Ok(())
    }
}

fn decode_member<T: DeserializeOwned>(member: &Member) -> Result<T> {
    serde_json::from_slice(&member.contents).map_err(|e| Error {
        kind: ErrorKind::Parse,
        context: format!("Cannot decode {}: {}", member.name, e),
    })
}
