pub mod simulation;

pub use simulation::{
    run_waterfall_monte_carlo, McDistribution, McPartnerResult, McPercentiles, McStatistics,
    McWaterfallInput, McWaterfallOutput,
};
