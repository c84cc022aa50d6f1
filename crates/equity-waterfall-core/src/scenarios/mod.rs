pub mod sensitivity;

pub use sensitivity::{
    run_waterfall_sensitivity, OutputMetric, SensitivityAxis, SensitivityTarget,
    WaterfallSensitivityInput, WaterfallSensitivityOutput,
};
