//! Bounded worker pool that runs the activity policy off the request path.
//!
//! Requests hand a user id to [`ActivityTracker::track`], which never blocks: when the queue is
//! full or closed the job is dropped and logged. Workers share one receiver and publish outcomes
//! on [`ActivityResults`] so hosts and tests can observe background work. The results channel
//! holds at most `queue_capacity` unread outcomes; further outcomes are logged and discarded.

// crates.io
use tokio::{
	sync::mpsc::{self, error::TrySendError},
	task::JoinHandle,
	time::{self as tokio_time, Instant},
};
// self
use crate::{
	_prelude::*,
	auth::UserId,
	config::TrackerConfig,
	obs::{self, SessionOp},
	session::{ActivityReport, SessionManager},
};

type JobReceiver = Arc<AsyncMutex<mpsc::Receiver<UserId>>>;
type JobResult = Result<ActivityReport, ActivityFailure>;

/// Activity job that failed inside a worker.
#[derive(Debug, ThisError)]
#[error("Activity tracking failed for user {user_id}.")]
pub struct ActivityFailure {
	/// Account the job ran for.
	pub user_id: UserId,
	/// Underlying failure.
	#[source]
	pub error: Error,
}

/// Stream of background job outcomes.
#[derive(Debug)]
pub struct ActivityResults(mpsc::Receiver<JobResult>);
impl ActivityResults {
	/// Waits for the next outcome; `None` once every worker has exited.
	pub async fn recv(&mut self) -> Option<JobResult> {
		self.0.recv().await
	}

	/// Returns an outcome if one is ready.
	pub fn try_recv(&mut self) -> Option<JobResult> {
		self.0.try_recv().ok()
	}
}

/// Handle used by the request path to enqueue activity jobs.
#[derive(Debug)]
pub struct ActivityTracker {
	sender: mpsc::Sender<UserId>,
	workers: Vec<JoinHandle<()>>,
}
impl ActivityTracker {
	/// Starts `config.workers` tasks on the current Tokio runtime.
	pub fn spawn(manager: Arc<SessionManager>, config: &TrackerConfig) -> (Self, ActivityResults) {
		let capacity = config.queue_capacity.max(1);
		let (sender, receiver) = mpsc::channel(capacity);
		let (results_tx, results_rx) = mpsc::channel(capacity);
		let receiver: JobReceiver = Arc::new(AsyncMutex::new(receiver));
		let workers = (0..config.workers.max(1))
			.map(|_| tokio::spawn(run_worker(manager.clone(), receiver.clone(), results_tx.clone())))
			.collect();

		(Self { sender, workers }, ActivityResults(results_rx))
	}

	/// Enqueues an activity job for `user_id`; returns `false` if it was dropped.
	pub fn track(&self, user_id: UserId) -> bool {
		match self.sender.try_send(user_id) {
			Ok(()) => true,
			Err(TrySendError::Full(user_id)) => {
				obs::activity_dropped(&user_id, "queue full");

				false
			},
			Err(TrySendError::Closed(user_id)) => {
				obs::activity_dropped(&user_id, "queue closed");

				false
			},
		}
	}

	/// Closes the queue and waits up to `grace` for queued jobs to drain.
	///
	/// Workers still running at the deadline are aborted; returns how many were.
	pub async fn shutdown(self, grace: std::time::Duration) -> usize {
		let Self { sender, workers } = self;

		drop(sender);

		let deadline = Instant::now() + grace;
		let mut abandoned = 0;

		for mut worker in workers {
			if tokio_time::timeout_at(deadline, &mut worker).await.is_err() {
				worker.abort();

				abandoned += 1;
			}
		}

		abandoned
	}
}

fn job_user(result: &JobResult) -> &UserId {
	match result {
		Ok(report) => &report.user_id,
		Err(failure) => &failure.user_id,
	}
}

async fn run_worker(
	manager: Arc<SessionManager>,
	receiver: JobReceiver,
	results: mpsc::Sender<JobResult>,
) {
	loop {
		let job = receiver.lock().await.recv().await;
		let Some(user_id) = job else {
			break;
		};
		let result = manager
			.record_activity(&user_id)
			.await
			.map_err(|error| ActivityFailure { user_id, error });

		if let Err(failure) = &result {
			obs::background_failure(SessionOp::Activity, &failure.user_id, &failure.error);
		}

		match results.try_send(result) {
			Ok(()) => (),
			Err(TrySendError::Full(result)) => obs::activity_result_dropped(job_user(&result)),
			// Hosts may drop the results stream.
			Err(TrySendError::Closed(_)) => (),
		}
	}
}
