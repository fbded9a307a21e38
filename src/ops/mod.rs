pub mod contour;
pub mod grow;
pub mod morphology;
pub mod shapes;
