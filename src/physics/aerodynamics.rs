// ---------------------------------------------------------------------------
// Drag coefficient as a function of Mach number
// ---------------------------------------------------------------------------

/// Anything that maps a Mach number to a drag coefficient.
///
/// Injected into [`BallisticModel`](crate::dynamics::BallisticModel) at
/// construction. Plain closures `Fn(f64) -> f64` qualify.
pub trait DragCoefficient {
    fn cd(&self, mach: f64) -> f64;
}

impl<F> DragCoefficient for F
where
    F: Fn(f64) -> f64,
{
    fn cd(&self, mach: f64) -> f64 {
        self(mach)
    }
}

/// Mach-independent drag coefficient. Defaults to 1.0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantCd(pub f64);

impl Default for ConstantCd {
    fn default() -> Self {
        Self(1.0)
    }
}

impl DragCoefficient for ConstantCd {
    fn cd(&self, _mach: f64) -> f64 {
        self.0
    }
}

const SUBSONIC_CD: f64 = 0.5;
const TRANSONIC_PEAK_CD: f64 = 1.1;
const HYPERSONIC_CD: f64 = 0.6;

const MACH_TRANSONIC_START: f64 = 0.8;
const MACH_TRANSONIC_PEAK: f64 = 1.2;
const MACH_HYPERSONIC: f64 = 5.0;

/// Piecewise-linear blunt-body drag curve with a transonic drag rise.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MachTable;

impl DragCoefficient for MachTable {
    fn cd(&self, mach: f64) -> f64 {
        drag_coefficient(mach)
    }
}

/// Blunt-body Cd over `|mach|`:
///   < 0.8       0.5 plateau
///   [0.8, 1.2)  linear rise to 1.1
///   [1.2, 5.0)  linear decay to 0.6
///   >= 5.0      0.6 plateau
pub fn drag_coefficient(mach: f64) -> f64 {
    let m = mach.abs();
    if m < MACH_TRANSONIC_START {
        SUBSONIC_CD
    } else if m < MACH_TRANSONIC_PEAK {
        let frac = (m - MACH_TRANSONIC_START) / (MACH_TRANSONIC_PEAK - MACH_TRANSONIC_START);
        SUBSONIC_CD + frac * (TRANSONIC_PEAK_CD - SUBSONIC_CD)
    } else if m < MACH_HYPERSONIC {
        let frac = (m - MACH_TRANSONIC_PEAK) / (MACH_HYPERSONIC - MACH_TRANSONIC_PEAK);
        TRANSONIC_PEAK_CD + frac * (HYPERSONIC_CD - TRANSONIC_PEAK_CD)
    } else {
        HYPERSONIC_CD
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn breakpoint_values_are_exact() {
        assert_eq!(drag_coefficient(0.8), 0.5);
        assert_eq!(drag_coefficient(1.2), 1.1);
        assert_eq!(drag_coefficient(5.0), 0.6);
        assert_eq!(drag_coefficient(0.0), 0.5);
        assert_eq!(drag_coefficient(25.0), 0.6);
    }

    #[test]
    fn transonic_rise_is_monotone() {
        let mut prev = drag_coefficient(0.8);
        for i in 1..=400 {
            let m = 0.8 + 0.4 * i as f64 / 400.0;
            let cd = drag_coefficient(m);
            assert!(cd >= prev, "Cd decreased at Mach {:.4}", m);
            prev = cd;
        }
    }

    #[test]
    fn continuous_at_breakpoints() {
        for &m in &[0.8, 1.2, 5.0] {
            let below = drag_coefficient(m - 1e-9);
            let above = drag_coefficient(m);
            assert!((below - above).abs() < 1e-6, "jump at Mach {}", m);
        }
    }

    #[test]
    fn negative_mach_uses_magnitude() {
        assert_eq!(drag_coefficient(-2.0), drag_coefficient(2.0));
    }

    #[test]
    fn closures_are_drag_laws() {
        let law = |m: f64| 0.3 + 0.1 * m;
        assert!((law.cd(2.0) - 0.5).abs() < 1e-12);
        assert_eq!(ConstantCd::default().cd(3.0), 1.0);
        assert_eq!(MachTable.cd(1.2), 1.1);
    }
}
