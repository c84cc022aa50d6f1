pub mod monte_carlo;
pub mod returns;
pub mod sensitivity;
pub mod waterfall;
