//! Channel configuration for pipeline stages

/// Buffer sizes for the channels connecting the pipeline stages
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Task queue buffer size (source -> workers)
    pub task_buffer: usize,

    /// Result channel buffer size (workers -> aggregator)
    pub result_buffer: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            task_buffer: 1,
            result_buffer: 1_024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_config_default() {
        let config = ChannelConfig::default();
        assert_eq!(config.task_buffer, 1);
        assert_eq!(config.result_buffer, 1_024);
    }
}
