//! Background worker that loads logs and runs the pipeline off the UI thread

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{Receiver, Sender, TryRecvError, channel};
use std::thread::{self, JoinHandle};

use runlog_oxide::pipeline::{self, Report};
use runlog_oxide::{ExperimentConfig, PipelineError};

use super::{PreparedChart, prepare_chart};

pub enum WorkerRequest {
    /// Load `path` and run `config` over it
    Run {
        path: PathBuf,
        config: Box<ExperimentConfig>,
        downsample: usize,
    },
    Shutdown,
}

pub enum WorkerResult {
    Ready {
        path: PathBuf,
        report: Arc<Report>,
        charts: Vec<PreparedChart>,
    },
    Failed {
        path: PathBuf,
        error: PipelineError,
    },
}

pub struct BackgroundWorker {
    tx: Sender<WorkerRequest>,
    rx: Receiver<WorkerResult>,
    handle: Option<JoinHandle<()>>,
    pending: usize,
}

impl BackgroundWorker {
    pub fn spawn() -> Self {
        let (req_tx, req_rx) = channel::<WorkerRequest>();
        let (res_tx, res_rx) = channel::<WorkerResult>();

        let handle = thread::Builder::new()
            .name("runlog-worker".into())
            .spawn(move || Self::worker_loop(req_rx, res_tx))
            .map_err(|e| tracing::error!("failed to spawn worker thread: {e}"))
            .ok();

        Self {
            tx: req_tx,
            rx: res_rx,
            handle,
            pending: 0,
        }
    }

    fn worker_loop(rx: Receiver<WorkerRequest>, tx: Sender<WorkerResult>) {
        while let Ok(request) = rx.recv() {
            let result = match request {
                WorkerRequest::Run {
                    path,
                    config,
                    downsample,
                } => Self::run(path, &config, downsample),
                WorkerRequest::Shutdown => break,
            };

            if tx.send(result).is_err() {
                break;
            }
        }
    }

    fn run(path: PathBuf, config: &ExperimentConfig, downsample: usize) -> WorkerResult {
        profiling::scope!("worker_run");

        match pipeline::run_file(&path, config) {
            Ok(report) => {
                let charts = report.charts.iter().map(|c| prepare_chart(c, downsample)).collect();
                WorkerResult::Ready {
                    path,
                    report: Arc::new(report),
                    charts,
                }
            }
            Err(error) => {
                tracing::warn!(path = %path.display(), "run failed: {error}");
                WorkerResult::Failed { path, error }
            }
        }
    }

    /// Queue a request (non-blocking)
    pub fn request(&mut self, req: WorkerRequest) {
        if matches!(req, WorkerRequest::Run { .. }) && self.tx.send(req).is_ok() {
            self.pending += 1;
        }
    }

    /// Take a finished result, if any (non-blocking)
    pub fn poll(&mut self) -> Option<WorkerResult> {
        match self.rx.try_recv() {
            Ok(result) => {
                self.pending = self.pending.saturating_sub(1);
                Some(result)
            }
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Block for up to `timeout` waiting for a result
    #[cfg(test)]
    pub fn wait(&mut self, timeout: std::time::Duration) -> Option<WorkerResult> {
        match self.rx.recv_timeout(timeout) {
            Ok(result) => {
                self.pending = self.pending.saturating_sub(1);
                Some(result)
            }
            Err(_) => None,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.pending > 0
    }
}

impl Drop for BackgroundWorker {
    fn drop(&mut self) {
        let _ = self.tx.send(WorkerRequest::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Default for BackgroundWorker {
    fn default() -> Self {
        Self::spawn()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;
    use tempfile::Builder;

    use runlog_oxide::presets::preset;

    #[test]
    fn test_worker_runs_pipeline() {
        let mut file = Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "timestamp,clicks_on_dots,clicks_on_lines,number_of_clicks,mouse_x,mouse_y").unwrap();
        writeln!(file, "2024-01-15 14:30:00.000000000 -03:00,1,0,1,10,20").unwrap();
        writeln!(file, "2024-01-15 14:30:01.000000000 -03:00,1,1,2,12,25").unwrap();
        file.flush().unwrap();

        let mut worker = BackgroundWorker::spawn();
        worker.request(WorkerRequest::Run {
            path: file.path().to_path_buf(),
            config: Box::new(preset("clicks").unwrap()),
            downsample: 5000,
        });
        assert!(worker.is_busy());

        match worker.wait(Duration::from_secs(10)) {
            Some(WorkerResult::Ready { report, charts, .. }) => {
                assert_eq!(report.ingest.records, 2);
                assert_eq!(charts.len(), report.charts.len());
                assert_eq!(charts[0].series[2].points.len(), 2);
            }
            Some(WorkerResult::Failed { error, .. }) => panic!("run failed: {error}"),
            None => panic!("worker timed out"),
        }
        assert!(!worker.is_busy());
    }

    #[test]
    fn test_worker_reports_missing_file() {
        let mut worker = BackgroundWorker::spawn();
        worker.request(WorkerRequest::Run {
            path: PathBuf::from("/definitely/not/here.csv"),
            config: Box::new(preset("steps").unwrap()),
            downsample: 5000,
        });
        assert!(matches!(
            worker.wait(Duration::from_secs(10)),
            Some(WorkerResult::Failed { .. })
        ));
    }
}
