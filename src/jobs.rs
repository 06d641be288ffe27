use std::process::{Child, ExitStatus};

use log::warn;

/// One live background job.
#[derive(Debug)]
pub(crate) struct Job {
    pub(crate) id: u32,
    pub(crate) child: Child,
    pub(crate) cmdline: String,
}

/// A background job that has terminated and been reaped.
#[derive(Debug)]
pub(crate) struct FinishedJob {
    pub(crate) id: u32,
    pub(crate) pid: u32,
    pub(crate) status: ExitStatus,
    pub(crate) cmdline: String,
}

/// Registry of backgrounded children. The loop runs one non-blocking reap
/// pass per iteration, so terminated children never linger as zombies for
/// longer than one prompt.
#[derive(Debug)]
pub(crate) struct JobTable {
    next_id: u32,
    pub(crate) jobs: Vec<Job>,
}

impl JobTable {
    pub(crate) fn new() -> JobTable {
        JobTable {
            next_id: 1,
            jobs: Vec::new(),
        }
    }

    pub(crate) fn add(&mut self, child: Child, cmdline: &str) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        self.jobs.push(Job {
            id,
            child,
            cmdline: cmdline.to_string(),
        });
        id
    }

    /// One `try_wait` pass over all registered jobs. Finished jobs are
    /// removed and returned; jobs whose wait fails are dropped with a
    /// warning instead of being retried forever.
    pub(crate) fn reap(&mut self) -> Vec<FinishedJob> {
        let mut finished = Vec::new();

        self.jobs.retain_mut(|job| match job.child.try_wait() {
            Ok(Some(status)) => {
                finished.push(FinishedJob {
                    id: job.id,
                    pid: job.child.id(),
                    status,
                    cmdline: job.cmdline.clone(),
                });
                false
            }
            Ok(None) => true,
            Err(e) => {
                warn!("wait for background job [{}] failed: {}", job.id, e);
                false
            }
        });

        finished
    }

    pub(crate) fn len(&self) -> usize {
        self.jobs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::JobTable;
    use std::process::Command;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_reap_finished_job() {
        let mut table = JobTable::new();
        let child = Command::new("true").spawn().unwrap();
        let pid = child.id();
        let id = table.add(child, "true &");
        assert_eq!(id, 1);

        // bounded poll; `true` exits almost immediately
        let mut finished = Vec::new();
        for _ in 0..50 {
            finished = table.reap();
            if !finished.is_empty() {
                break;
            }
            thread::sleep(Duration::from_millis(20));
        }

        assert_eq!(finished.len(), 1);
        assert_eq!(finished[0].id, 1);
        assert_eq!(finished[0].pid, pid);
        assert_eq!(finished[0].cmdline, "true &");
        assert!(finished[0].status.success());
        assert_eq!(table.len(), 0);
    }

    #[test]
    fn test_running_job_stays_registered() {
        let mut table = JobTable::new();
        let child = Command::new("sleep").arg("5").spawn().unwrap();
        table.add(child, "sleep 5 &");

        assert!(table.reap().is_empty());
        assert_eq!(table.len(), 1);

        // clean up the sleeper
        for job in &mut table.jobs {
            job.child.kill().unwrap();
            job.child.wait().unwrap();
        }
    }

    #[test]
    fn test_job_ids_increment() {
        let mut table = JobTable::new();
        let a = table.add(Command::new("true").spawn().unwrap(), "true &");
        let b = table.add(Command::new("true").spawn().unwrap(), "true &");
        assert_eq!((a, b), (1, 2));

        // reap both so the children do not outlive the test
        for _ in 0..50 {
            table.reap();
            if table.len() == 0 {
                break;
            }
            thread::sleep(Duration::from_millis(20));
        }
    }
}
