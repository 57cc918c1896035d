pub mod benefit;

pub use benefit::{Benefit, BenefitFilter, BenefitSource};
