use super::{ActiveMaterial, arrhenius, polyval};

/// NMC532 with a polynomial equilibrium potential fit.
#[derive(Clone, Debug)]
pub struct Nmc532Fast {
    pub alpha_a: f64,
    pub alpha_c: f64,
}

/// log10 of the diffusivity, highest power first.
const DS: [f64; 11] = [
    -2.509010843479270e2,
    2.391026725259970e3,
    -4.868420267611360e3,
    -8.331104102921070e1,
    1.057636028329000e4,
    -1.268324548348120e4,
    5.016272167775530e3,
    9.824896659649480e2,
    -1.502439339070900e3,
    4.723709304247700e2,
    -6.526092046397090e1,
];

const I0: [f64; 6] = [
    1.650452829641290e1,
    -7.523567141488800e1,
    1.240524690073040e2,
    -9.416571081287610e1,
    3.249768821737960e1,
    -3.585290065824760e0,
];

/// Polynomial part of the equilibrium potential, x^14 down to x^0.
const EEQ: [f64; 15] = [
    -3.640117692001490e3,
    1.317657544484270e4,
    -1.455742062291360e4,
    -1.571094264365090e3,
    1.265630978512400e4,
    -2.057808873526350e3,
    -1.074374333186190e4,
    8.698112755348720e3,
    -8.297904604107030e2,
    -2.073765547574810e3,
    1.190223421193310e3,
    -2.724851668445780e2,
    2.723409218042130e1,
    -4.158276603609060e0,
    5.314735633000300e0,
];

const EEQ_EXP: [f64; 3] = [-5.573191762723310e-4, 6.560240842659690e0, 4.148209275061330e1];

impl Nmc532Fast {
    pub fn new(alpha_a: f64, alpha_c: f64) -> Self {
        Self { alpha_a, alpha_c }
    }
}

impl ActiveMaterial for Nmc532Fast {
    fn diffusivity(&self, x: f64, temp: f64, _fluxdir: f64) -> f64 {
        arrhenius(temp) * 2.25 * 10f64.powf(polyval(&DS, x))
    }

    fn exchange_current(&self, x: f64, c_li: f64, temp: f64, _fluxdir: f64) -> f64 {
        9.0 * (c_li / 1.2).powf(self.alpha_a) * arrhenius(temp) * polyval(&I0, x)
    }

    fn equilibrium_potential(&self, x: f64, _temp: f64) -> f64 {
        polyval(&EEQ, x) + EEQ_EXP[0] * (EEQ_EXP[1] * x.powf(EEQ_EXP[2])).exp()
    }

    fn hysteresis_magnitude(&self, _x: f64) -> f64 {
        0.03
    }

    fn alpha_a(&self) -> f64 {
        self.alpha_a
    }

    fn alpha_c(&self) -> f64 {
        self.alpha_c
    }
}
