//! Chi-square survival probability.

use statrs::function::gamma::gamma_ur;

/// Probability that a chi-square with `ndf` degrees of freedom exceeds
/// `chi2`: the upper regularized incomplete gamma `Q(ndf/2, chi2/2)`.
///
/// Edge cases follow the ROOT `TMath::Prob` conventions: non-positive
/// degrees of freedom or a negative chi-square yield 0, a zero chi-square
/// yields 1.
pub fn chi_squared_prob(chi2: f32, ndf: i32) -> f32 {
    if ndf <= 0 || chi2 < 0.0 {
        return 0.0;
    }
    if chi2 == 0.0 {
        return 1.0;
    }
    gamma_ur(f64::from(ndf) / 2.0, f64::from(chi2) / 2.0) as f32
}
