//! # Performance Overlay
//!
//! Tracks frame times between consecutive [`PerformanceMonitor::update`]
//! calls and draws a small FPS overlay with imgui.
//!
//! ## Usage
//!
//! ```rust
//! use vitrine::performance::PerformanceMonitor;
//!
//! let mut monitor = PerformanceMonitor::new();
//!
//! // Last step of every frame
//! monitor.update();
//! ```

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Derived frame statistics.
#[derive(Debug, Clone)]
pub struct PerformanceMetrics {
    /// Current frames per second
    pub fps: f32,
    /// Average frame time in milliseconds
    pub frame_time_ms: f32,
    /// Minimum frame time in the current window
    pub min_frame_time_ms: f32,
    /// Maximum frame time in the current window
    pub max_frame_time_ms: f32,
    /// Number of draw calls in the last frame
    pub draw_calls: u32,
    /// Number of vertices rendered in the last frame
    pub vertex_count: u32,
}

impl Default for PerformanceMetrics {
    fn default() -> Self {
        Self {
            fps: 0.0,
            frame_time_ms: 0.0,
            min_frame_time_ms: f32::MAX,
            max_frame_time_ms: 0.0,
            draw_calls: 0,
            vertex_count: 0,
        }
    }
}

pub struct PerformanceMonitor {
    /// Ring buffer of recent frame times for averaging
    frame_times: VecDeque<Duration>,
    max_samples: usize,
    last_tick: Option<Instant>,
    current_metrics: PerformanceMetrics,
    last_update: Instant,
    update_interval: Duration,
}

impl PerformanceMonitor {
    pub fn new() -> Self {
        Self::with_capacity(120) // ~2 seconds at 60fps
    }

    pub fn with_capacity(max_samples: usize) -> Self {
        Self {
            frame_times: VecDeque::with_capacity(max_samples),
            max_samples: max_samples.max(1),
            last_tick: None,
            current_metrics: PerformanceMetrics::default(),
            last_update: Instant::now(),
            update_interval: Duration::from_millis(100),
        }
    }

    /// Marks the end of a frame. The first call only starts the clock.
    pub fn update(&mut self) {
        let now = Instant::now();
        if let Some(last) = self.last_tick.replace(now) {
            self.add_frame_time(now - last);
        }
        // Refresh derived numbers ten times per second
        if self.last_update.elapsed() >= self.update_interval {
            self.update_metrics();
            self.last_update = now;
        }
    }

    /// Adds a frame time sample and recomputes the metrics immediately.
    pub fn record_frame(&mut self, frame_time: Duration) {
        self.add_frame_time(frame_time);
        self.update_metrics();
    }

    fn add_frame_time(&mut self, frame_time: Duration) {
        if self.frame_times.len() >= self.max_samples {
            self.frame_times.pop_front();
        }
        self.frame_times.push_back(frame_time);
    }

    fn update_metrics(&mut self) {
        if self.frame_times.is_empty() {
            return;
        }

        let total_time: Duration = self.frame_times.iter().sum();
        let avg_frame_time_ms = total_time.as_secs_f32() * 1000.0 / self.frame_times.len() as f32;

        self.current_metrics.frame_time_ms = avg_frame_time_ms;
        self.current_metrics.fps = if avg_frame_time_ms > 0.0 {
            1000.0 / avg_frame_time_ms
        } else {
            0.0
        };

        if let (Some(min_time), Some(max_time)) =
            (self.frame_times.iter().min(), self.frame_times.iter().max())
        {
            self.current_metrics.min_frame_time_ms = min_time.as_secs_f32() * 1000.0;
            self.current_metrics.max_frame_time_ms = max_time.as_secs_f32() * 1000.0;
        }
    }

    pub fn update_render_stats(&mut self, draw_calls: u32, vertex_count: u32) {
        self.current_metrics.draw_calls = draw_calls;
        self.current_metrics.vertex_count = vertex_count;
    }

    pub fn metrics(&self) -> &PerformanceMetrics {
        &self.current_metrics
    }

    /// Frame times in milliseconds, oldest first
    pub fn frame_time_history(&self) -> Vec<f32> {
        self.frame_times
            .iter()
            .map(|duration| duration.as_secs_f32() * 1000.0)
            .collect()
    }

    /// Compact corner overlay in the style of stats.js.
    pub fn render_overlay(&self, ui: &imgui::Ui) {
        let metrics = &self.current_metrics;
        let history = self.frame_time_history();

        ui.window("Stats")
            .size([180.0, 110.0], imgui::Condition::Always)
            .position([10.0, 10.0], imgui::Condition::Always)
            .no_decoration()
            .no_inputs()
            .bg_alpha(0.35)
            .build(|| {
                ui.text(format!("{:.0} FPS", metrics.fps));
                ui.same_line();
                ui.text(format!("{:.1} ms", metrics.frame_time_ms));
                if !history.is_empty() {
                    ui.plot_lines("##frame_times", &history)
                        .graph_size([160.0, 40.0])
                        .scale_min(0.0)
                        .scale_max(50.0)
                        .build();
                }
                ui.text(format!("{} draws", metrics.draw_calls));
            });
    }
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_average_recorded_frames() {
        let mut monitor = PerformanceMonitor::new();
        monitor.record_frame(Duration::from_millis(10));
        monitor.record_frame(Duration::from_millis(30));

        let metrics = monitor.metrics();
        assert!((metrics.frame_time_ms - 20.0).abs() < 1e-3);
        assert!((metrics.fps - 50.0).abs() < 1e-2);
        assert!((metrics.min_frame_time_ms - 10.0).abs() < 1e-3);
        assert!((metrics.max_frame_time_ms - 30.0).abs() < 1e-3);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut monitor = PerformanceMonitor::with_capacity(3);
        for ms in 1..=5 {
            monitor.record_frame(Duration::from_millis(ms));
        }
        assert_eq!(monitor.frame_time_history().len(), 3);
        assert!((monitor.frame_time_history()[0] - 3.0).abs() < 1e-3);
    }

    #[test]
    fn test_first_update_only_starts_clock() {
        let mut monitor = PerformanceMonitor::new();
        monitor.update();
        assert!(monitor.frame_time_history().is_empty());
        monitor.update();
        assert_eq!(monitor.frame_time_history().len(), 1);
    }
}
