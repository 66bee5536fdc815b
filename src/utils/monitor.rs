use serde::Serialize;
use std::time::{Duration, Instant};
#[cfg(feature = "cli")]
use sysinfo::{Pid, RefreshKind, System};

/// 單一階段的耗時紀錄，會寫入 summary.json
#[derive(Debug, Clone, Serialize)]
pub struct PhaseTiming {
    pub phase: String,
    pub elapsed_ms: u128,
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone)]
pub struct SystemStats {
    pub cpu_usage: f32,
    pub memory_usage_mb: u64,
    pub memory_usage_percent: f32,
    pub peak_memory_mb: u64,
    pub elapsed_time: Duration,
}

#[cfg(feature = "cli")]
pub struct SystemMonitor {
    system: Option<System>,
    pid: Option<Pid>,
    start_time: Instant,
    phase_start: Instant,
    phases: Vec<PhaseTiming>,
    peak_memory: u64,
    enabled: bool,
}

#[cfg(feature = "cli")]
impl SystemMonitor {
    pub fn new(enabled: bool) -> Self {
        // 取不到 PID 時只記錄耗時，不讀取系統資源
        let pid = sysinfo::get_current_pid().ok();
        let system = if enabled && pid.is_some() {
            let mut system = System::new_with_specifics(RefreshKind::everything());
            system.refresh_all();
            Some(system)
        } else {
            None
        };

        Self {
            system,
            pid,
            start_time: Instant::now(),
            phase_start: Instant::now(),
            phases: Vec::new(),
            peak_memory: 0,
            enabled,
        }
    }

    pub fn get_stats(&mut self) -> Option<SystemStats> {
        if !self.enabled {
            return None;
        }

        let pid = self.pid?;
        let system = self.system.as_mut()?;
        system.refresh_all();

        let process = system.process(pid)?;
        let memory_mb = process.memory() / 1024 / 1024;
        let total_memory = system.total_memory() / 1024 / 1024;
        let memory_percent = if total_memory > 0 {
            (memory_mb as f32 / total_memory as f32) * 100.0
        } else {
            0.0
        };

        self.peak_memory = self.peak_memory.max(memory_mb);

        Some(SystemStats {
            cpu_usage: process.cpu_usage(),
            memory_usage_mb: memory_mb,
            memory_usage_percent: memory_percent,
            peak_memory_mb: self.peak_memory,
            elapsed_time: self.start_time.elapsed(),
        })
    }

    /// 結束目前階段：記錄耗時並在啟用時輸出資源使用量
    pub fn finish_phase(&mut self, phase: &str) {
        let elapsed = self.phase_start.elapsed();
        self.phases.push(PhaseTiming {
            phase: phase.to_string(),
            elapsed_ms: elapsed.as_millis(),
        });
        self.phase_start = Instant::now();

        if let Some(stats) = self.get_stats() {
            tracing::info!(
                "📊 {} - CPU: {:.1}%, Memory: {}MB ({:.1}%), Peak: {}MB, Phase: {:?}",
                phase,
                stats.cpu_usage,
                stats.memory_usage_mb,
                stats.memory_usage_percent,
                stats.peak_memory_mb,
                elapsed
            );
        }
    }

    pub fn log_final_stats(&mut self) {
        if let Some(stats) = self.get_stats() {
            tracing::info!(
                "📊 Final Stats - Total Time: {:?}, Peak Memory: {}MB",
                stats.elapsed_time,
                stats.peak_memory_mb
            );
        }
    }

    pub fn phases(&self) -> &[PhaseTiming] {
        &self.phases
    }

    pub fn total_elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

#[cfg(feature = "cli")]
impl Default for SystemMonitor {
    fn default() -> Self {
        Self::new(false)
    }
}

// 非 CLI 環境只保留耗時紀錄
#[cfg(not(feature = "cli"))]
pub struct SystemMonitor {
    start_time: Instant,
    phase_start: Instant,
    phases: Vec<PhaseTiming>,
}

#[cfg(not(feature = "cli"))]
impl SystemMonitor {
    pub fn new(_enabled: bool) -> Self {
        Self {
            start_time: Instant::now(),
            phase_start: Instant::now(),
            phases: Vec::new(),
        }
    }

    pub fn finish_phase(&mut self, phase: &str) {
        self.phases.push(PhaseTiming {
            phase: phase.to_string(),
            elapsed_ms: self.phase_start.elapsed().as_millis(),
        });
        self.phase_start = Instant::now();
    }

    pub fn log_final_stats(&mut self) {}

    pub fn phases(&self) -> &[PhaseTiming] {
        &self.phases
    }

    pub fn total_elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn is_enabled(&self) -> bool {
        false
    }
}

#[cfg(not(feature = "cli"))]
impl Default for SystemMonitor {
    fn default() -> Self {
        Self::new(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phases_are_recorded_in_order() {
        let mut monitor = SystemMonitor::new(false);
        monitor.finish_phase("Ingestion");
        monitor.finish_phase("Scoring");

        let names: Vec<&str> = monitor.phases().iter().map(|p| p.phase.as_str()).collect();
        assert_eq!(names, vec!["Ingestion", "Scoring"]);
        assert!(!monitor.is_enabled());
    }
}
