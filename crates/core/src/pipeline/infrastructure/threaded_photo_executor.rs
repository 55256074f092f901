use std::panic::{self, AssertUnwindSafe};
use std::thread;

use crossbeam_channel::{Receiver, Sender};

use crate::pipeline::mask_photo_use_case::{MaskOutcome, PhotoRequest};
use crate::pipeline::photo_executor::{ExecutionError, PhotoExecutor, PhotoHandler};

const DEFAULT_CHANNEL_CAPACITY: usize = 8;

type Job = (usize, PhotoRequest);
type JobResult = (usize, Result<MaskOutcome, ExecutionError>);

/// Runs requests on a fixed pool of worker threads.
///
/// Layout: `feeder → [job queue] → N workers → [result queue] → caller`
///
/// Both queues are bounded, so at most a few encoded photos are buffered
/// ahead of the workers.
pub struct ThreadedPhotoExecutor {
    workers: usize,
    channel_capacity: usize,
}

impl ThreadedPhotoExecutor {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }
}

impl Default for ThreadedPhotoExecutor {
    fn default() -> Self {
        Self::new(thread::available_parallelism().map(|n| n.get()).unwrap_or(1))
    }
}

impl PhotoExecutor for ThreadedPhotoExecutor {
    fn execute_all(
        &self,
        handler: &dyn PhotoHandler,
        requests: Vec<PhotoRequest>,
    ) -> Vec<Result<MaskOutcome, ExecutionError>> {
        let total = requests.len();
        if total == 0 {
            return Vec::new();
        }
        let workers = self.workers.min(total);
        log::debug!("Processing {total} photo(s) on {workers} worker(s)");

        let (job_tx, job_rx) = crossbeam_channel::bounded::<Job>(self.channel_capacity);
        let (result_tx, result_rx) = crossbeam_channel::bounded::<JobResult>(self.channel_capacity);

        thread::scope(|scope| {
            for _ in 0..workers {
                let job_rx = job_rx.clone();
                let result_tx = result_tx.clone();
                scope.spawn(move || run_worker(handler, job_rx, result_tx));
            }
            drop(job_rx);
            drop(result_tx);

            scope.spawn(move || feed(requests, job_tx));

            collect_in_order(result_rx, total)
        })
    }
}

fn feed(requests: Vec<PhotoRequest>, job_tx: Sender<Job>) {
    for job in requests.into_iter().enumerate() {
        if job_tx.send(job).is_err() {
            break;
        }
    }
}

fn run_worker(handler: &dyn PhotoHandler, job_rx: Receiver<Job>, result_tx: Sender<JobResult>) {
    for (index, request) in job_rx {
        let result = match panic::catch_unwind(AssertUnwindSafe(|| handler.handle(&request))) {
            Ok(result) => result.map_err(ExecutionError::from),
            Err(_) => {
                log::error!("Worker panicked on request {index} (user {})", request.user);
                Err(ExecutionError::WorkerPanicked { index })
            }
        };
        if result_tx.send((index, result)).is_err() {
            break;
        }
    }
}

fn collect_in_order(
    result_rx: Receiver<JobResult>,
    total: usize,
) -> Vec<Result<MaskOutcome, ExecutionError>> {
    let mut slots: Vec<Option<Result<MaskOutcome, ExecutionError>>> =
        (0..total).map(|_| None).collect();
    for (index, result) in result_rx {
        slots[index] = Some(result);
    }
    slots
        .into_iter()
        .enumerate()
        .map(|(index, slot)| slot.unwrap_or(Err(ExecutionError::WorkerPanicked { index })))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compositing::domain::mask_style::MaskStyle;
    use crate::imaging::domain::image_encoder::EncodeError;
    use crate::pipeline::mask_photo_use_case::PipelineError;
    use crate::pipeline::mask_status::MaskStatus;
    use crate::preferences::domain::user_id::UserId;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Echoes the first photo byte back as the image; byte 0 panics and
    /// byte 1 fails to encode.
    struct EchoHandler {
        threads: Mutex<HashSet<thread::ThreadId>>,
    }

    impl EchoHandler {
        fn new() -> Self {
            Self {
                threads: Mutex::new(HashSet::new()),
            }
        }
    }

    impl PhotoHandler for EchoHandler {
        fn handle(&self, request: &PhotoRequest) -> Result<MaskOutcome, PipelineError> {
            self.threads.lock().unwrap().insert(thread::current().id());
            let tag = request.photo[0];
            // Later requests finish first so ordering is exercised.
            thread::sleep(Duration::from_millis(u64::from(20u8.saturating_sub(tag))));
            match tag {
                0 => panic!("boom"),
                1 => Err(PipelineError::Encode(EncodeError::InvalidQuality(0))),
                _ => Ok(MaskOutcome {
                    status: MaskStatus::Success,
                    style: MaskStyle::FaceMask,
                    faces: Vec::new(),
                    image: Some(vec![tag]),
                }),
            }
        }
    }

    fn requests(tags: impl IntoIterator<Item = u8>) -> Vec<PhotoRequest> {
        tags.into_iter()
            .map(|t| PhotoRequest::new(UserId(t as i64), vec![t]))
            .collect()
    }

    fn image_tag(result: &Result<MaskOutcome, ExecutionError>) -> u8 {
        result.as_ref().unwrap().image.as_ref().unwrap()[0]
    }

    #[test]
    fn test_empty_batch() {
        let results = ThreadedPhotoExecutor::new(4).execute_all(&EchoHandler::new(), Vec::new());
        assert!(results.is_empty());
    }

    #[test]
    fn test_results_in_request_order() {
        let tags: Vec<u8> = (2..20).collect();
        let results =
            ThreadedPhotoExecutor::new(4).execute_all(&EchoHandler::new(), requests(tags.clone()));
        let got: Vec<u8> = results.iter().map(image_tag).collect();
        assert_eq!(got, tags);
    }

    #[test]
    fn test_uses_multiple_workers() {
        let handler = EchoHandler::new();
        ThreadedPhotoExecutor::new(3).execute_all(&handler, requests(2..14));
        assert!(handler.threads.lock().unwrap().len() > 1);
    }

    #[test]
    fn test_panic_is_isolated_to_its_request() {
        let results =
            ThreadedPhotoExecutor::new(2).execute_all(&EchoHandler::new(), requests([5, 0, 6]));
        assert_eq!(image_tag(&results[0]), 5);
        assert!(matches!(
            results[1],
            Err(ExecutionError::WorkerPanicked { index: 1 })
        ));
        assert_eq!(image_tag(&results[2]), 6);
    }

    #[test]
    fn test_pipeline_error_is_reported() {
        let results =
            ThreadedPhotoExecutor::new(2).execute_all(&EchoHandler::new(), requests([1, 7]));
        assert!(matches!(
            results[0],
            Err(ExecutionError::Pipeline(PipelineError::Encode(_)))
        ));
        assert_eq!(image_tag(&results[1]), 7);
    }

    #[test]
    fn test_more_requests_than_queue_capacity() {
        let batch = requests(std::iter::repeat(19).take(DEFAULT_CHANNEL_CAPACITY * 3));
        let results = ThreadedPhotoExecutor::new(1).execute_all(&EchoHandler::new(), batch);
        assert_eq!(results.len(), DEFAULT_CHANNEL_CAPACITY * 3);
        assert!(results.iter().all(|r| r.is_ok()));
    }

    #[test]
    fn test_zero_workers_clamped_to_one() {
        assert_eq!(ThreadedPhotoExecutor::new(0).workers(), 1);
    }
}
