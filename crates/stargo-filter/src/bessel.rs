//! Bessel prototype poles
//!
//! One member of each complex-conjugate pair, orders 1 through 10 packed
//! back to back. The poles for order `n` start at index `n * n / 4`; odd
//! orders begin with their single real pole.

use num_complex::Complex64;

/// Highest order covered by the table
pub const MAX_ORDER: u32 = 10;

const POLES: [(f64, f64); 30] = [
    (-1.000_000_000_00, 0.000_000_000_00),
    (-1.101_601_330_59, 0.636_009_824_757),
    (-1.322_675_799_91, 0.000_000_000_00),
    (-1.047_409_161_01, 0.999_264_436_281),
    (-1.370_067_830_55, 0.410_249_717_494),
    (-0.995_208_764_350, 1.257_105_739_45),
    (-1.502_316_271_45, 0.000_000_000_00),
    (-1.380_877_325_86, 0.717_909_587_627),
    (-0.957_676_548_563, 1.471_124_320_73),
    (-1.571_490_403_62, 0.320_896_374_221),
    (-1.381_858_097_60, 0.971_471_890_712),
    (-0.930_656_522_947, 1.661_863_268_94),
    (-1.684_368_179_27, 0.000_000_000_00),
    (-1.612_038_766_22, 0.589_244_506_931),
    (-1.378_903_216_80, 1.191_566_777_80),
    (-0.909_867_780_623, 1.836_451_353_04),
    (-1.757_408_400_40, 0.272_867_575_103),
    (-1.636_939_418_13, 0.822_795_625_139),
    (-1.373_841_217_64, 1.388_356_575_88),
    (-0.892_869_718_847, 1.998_325_843_64),
    (-1.856_600_501_23, 0.000_000_000_00),
    (-1.807_170_534_96, 0.512_383_730_575),
    (-1.652_396_484_58, 1.031_389_566_98),
    (-1.367_588_309_79, 1.567_733_712_24),
    (-0.878_399_276_161, 2.149_800_524_31),
    (-1.927_619_691_45, 0.241_623_471_082),
    (-1.842_196_244_43, 0.727_257_597_722),
    (-1.661_810_241_40, 1.221_100_218_57),
    (-1.360_692_278_38, 1.733_505_742_67),
    (-0.865_756_901_707, 2.292_604_830_98),
];

/// All `order` s-plane poles of the Bessel prototype, conjugates expanded
///
/// Returns `None` above [`MAX_ORDER`].
pub fn poles(order: u32) -> Option<Vec<Complex64>> {
    if order == 0 || order > MAX_ORDER {
        return None;
    }

    let mut idx = (order * order / 4) as usize;
    let mut out = Vec::with_capacity(order as usize);
    if order % 2 == 1 {
        let (re, im) = POLES[idx];
        out.push(Complex64::new(re, im));
        idx += 1;
    }
    for _ in 0..order / 2 {
        let pole = Complex64::new(POLES[idx].0, POLES[idx].1);
        out.push(pole);
        out.push(pole.conj());
        idx += 1;
    }
    Some(out)
}
