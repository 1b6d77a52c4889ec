use crate::cycle::{CycleRunner, CycleSummary};
use crate::error::IngestError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info};

/// # Summary
/// 调度循环状态。
///
/// # Invariants
/// - 正常运行时只在 `RunningCycle` 与 `Sleeping` 之间切换。
/// - `Stopped` 只能由外部中断进入。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    RunningCycle,
    Sleeping,
    Stopped,
}

/// # Summary
/// 调度循环退出时的运行统计。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerReport {
    // 已执行的周期数（含失败周期）
    pub cycles: u64,
    // 逃逸出按源隔离边界的故障数
    pub faults: u64,
    // 累计写入的信号数
    pub inserted: usize,
}

/// # Summary
/// 以固定间隔无限驱动采集周期。
///
/// # Invariants
/// - 第 N+1 个周期必须在第 N 个周期及其休眠完全结束后才开始。
/// - 任何周期故障（包括 panic）都不会终止循环。
pub struct Scheduler {
    runner: Arc<dyn CycleRunner>,
    interval: Duration,
    state: SchedulerState,
}

impl Scheduler {
    pub fn new(runner: Arc<dyn CycleRunner>, interval: Duration) -> Self {
        Self {
            runner,
            interval,
            state: SchedulerState::Idle,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    fn transition(&mut self, next: SchedulerState) {
        debug!("Scheduler state {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// # Summary
    /// 运行调度循环，直到收到中断信号。
    ///
    /// # Logic
    /// 1. 检查中断信号，已置位则退出。
    /// 2. 在独立任务中执行一个周期，panic 被捕获为 `SchedulerFault`。
    /// 3. 记录周期结果；故障只记录日志，不终止循环。
    /// 4. 休眠固定间隔，休眠期间响应中断。
    ///
    /// # Arguments
    /// * `shutdown` - 中断信号；值为 `true` 或发送端全部释放时视为退出请求。
    ///
    /// # Returns
    /// 退出时的运行统计。
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> SchedulerReport {
        let mut report = SchedulerReport::default();
        info!("Scheduler started, interval {:?}", self.interval);

        loop {
            if *shutdown.borrow_and_update() {
                break;
            }

            self.transition(SchedulerState::RunningCycle);
            match self.run_cycle().await {
                Ok(summary) => {
                    report.inserted += summary.inserted;
                    if !summary.is_clean() {
                        info!(
                            "[{}] Cycle finished with {} failed sources",
                            summary.cycle_id,
                            summary.failures.len()
                        );
                    }
                }
                Err(e) => {
                    report.faults += 1;
                    error!("Cycle aborted, resuming after {:?}: {}", self.interval, e);
                }
            }
            report.cycles += 1;

            self.transition(SchedulerState::Sleeping);
            info!("Cycle complete. Sleeping for {:?}...", self.interval);
            if sleep_or_shutdown(self.interval, &mut shutdown).await {
                break;
            }
        }

        self.transition(SchedulerState::Stopped);
        info!(
            "Scheduler stopped after {} cycles ({} faults, {} signals inserted)",
            report.cycles, report.faults, report.inserted
        );
        report
    }

    async fn run_cycle(&self) -> Result<CycleSummary, IngestError> {
        let runner = self.runner.clone();
        match tokio::spawn(async move { runner.run_once().await }).await {
            Ok(result) => result,
            Err(join_err) => Err(IngestError::SchedulerFault(join_err.to_string())),
        }
    }
}

/// 休眠 `interval`，期间收到中断返回 `true`。
async fn sleep_or_shutdown(interval: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    let sleep = tokio::time::sleep(interval);
    tokio::pin!(sleep);

    loop {
        tokio::select! {
            _ = &mut sleep => return false,
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow_and_update() {
                    return true;
                }
            }
        }
    }
}
