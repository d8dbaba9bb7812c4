use crate::queue::BootDiagnostic;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// 启动结果汇总
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootReport {
    /// 从存储恢复的描述符数量
    pub restored: usize,
    /// 被丢弃的记录
    pub dropped: Vec<BootDiagnostic>,
}

/// 引擎运行句柄：用于优雅关闭与等待任务结束
pub struct EngineHandle {
    pub(super) token: CancellationToken,
    pub(super) tasks: Vec<JoinHandle<()>>,
    pub(super) report: BootReport,
}

impl EngineHandle {
    pub fn report(&self) -> &BootReport {
        &self.report
    }

    pub fn shutdown(&self) {
        self.token.cancel();
    }

    pub async fn join(mut self) {
        let tasks = std::mem::take(&mut self.tasks);

        for t in tasks {
            let _ = t.await;
        }
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
