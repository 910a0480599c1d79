//! Create parameters for the hpbfv encryption scheme.

use crate::hpbfv::encoding::SlotTransform;
use crate::{ParametersError, Result};
use num_bigint::{BigInt, BigUint, Sign};
use num_traits::{ToPrimitive, Zero};
use spdz_math::rq::{traits::TryConvertFrom, Context, Poly, Representation, Scaler, ScalingFactor};
use std::fmt::Debug;
use std::sync::Arc;

/// Literal description of a parameter set, suitable for constant presets.
#[derive(Debug, Clone, PartialEq)]
pub struct HpbfvParametersLiteral {
    /// Polynomial degree N.
    pub degree: usize,
    /// Number of message slots s; the plaintext modulus polynomial is
    /// x^s - beta.
    pub slots: usize,
    /// Plaintext base beta; the slot modulus is t = beta^(N/s) + 1.
    pub beta: u64,
    /// Ciphertext modulus chain Q.
    pub q: &'static [u64],
    /// Auxiliary modulus chain QMul used by the tensoring.
    pub q_mul: &'static [u64],
    /// Special modulus chain P used by the gadget ciphertexts.
    pub p: &'static [u64],
    /// Standard deviation of the error distribution.
    pub sigma: f64,
    /// Hamming weight of the ternary secrets.
    pub hamming_weight: usize,
    /// Base-2 logarithm of the power-of-two gadget refinement; 0 disables
    /// the refinement.
    pub pow2_base: usize,
}

/// Parameters for the SOHO triple-generation protocol.
pub const SOHO: HpbfvParametersLiteral = HpbfvParametersLiteral {
    degree: 4096,
    slots: 256,
    beta: 44,
    q: &[0xfffffffffffc001, 0xffffffffffe8001, 0xffffffffffd8001],
    q_mul: &[
        0x1ffffffffffde001,
        0x1ffffffffffce001,
        0x1ffffffffffa4001,
        0x1ffffffffff92001,
    ],
    p: &[0xffffffffffc4001],
    sigma: 3.2,
    hamming_weight: 128,
    pow2_base: 0,
};

/// Parameters for the HEMI pairwise triple-generation protocol.
pub const HEMI: HpbfvParametersLiteral = HpbfvParametersLiteral {
    degree: 2048,
    slots: 128,
    beta: 44,
    q: &[0xfffffffffffc001, 0xffffffffffe8001, 0xffffffffffd8001],
    q_mul: &[
        0x1ffffffffffed001,
        0x1ffffffffffde001,
        0x1ffffffffffd1001,
        0x1ffffffffffce001,
    ],
    p: &[0xffffffffffc4001],
    sigma: 3.2,
    hamming_weight: 64,
    pow2_base: 0,
};

/// Parameters with N = 2^13, 2^10 slots and a 129-bit slot modulus.
pub const HPN13D10T128: HpbfvParametersLiteral = HpbfvParametersLiteral {
    degree: 8192,
    slots: 1024,
    beta: 65624,
    q: &[
        0xfffffffffffc001,
        0xffffffffffe8001,
        0xffffffffffd8001,
        0xffffffffffc4001,
    ],
    q_mul: &[
        0x1ffffffffffa4001,
        0x1ffffffffff74001,
        0x1ffffffffff0c001,
        0x1fffffffffec4001,
        0x1fffffffffe10001,
    ],
    p: &[0x1fffffffffe00001],
    sigma: 3.2,
    hamming_weight: 192,
    pow2_base: 16,
};

/// Parameters for the hpbfv encryption scheme.
///
/// This struct consolidates the raw parameters together with the
/// pre-computed contexts, scaling polynomial, inter-basis scalers, gadget
/// vector residues and slot transform needed by the operations.
pub struct HpbfvParameters {
    degree: usize,
    slots: usize,
    gap: usize,
    beta: BigUint,
    t: BigUint,
    sigma: f64,
    gaussian_bound: i64,
    hamming_weight: usize,
    pow2_base: usize,
    decomp_rns: usize,
    decomp_pw2: usize,

    moduli_q: Box<[u64]>,
    moduli_q_mul: Box<[u64]>,
    moduli_p: Box<[u64]>,

    ctx_q: Arc<Context>,
    ctx_qp: Arc<Context>,
    ctx_qqmul: Arc<Context>,

    pub(crate) delta: Poly,
    pub(crate) extender_qmul: Scaler,
    pub(crate) lifter_qmul: Scaler,
    pub(crate) down_scaler_qmul: Scaler,
    pub(crate) down_scaler_p: Scaler,
    pub(crate) gadget_vectors: Vec<Vec<Box<[u64]>>>,
    pub(crate) slot_transform: Arc<SlotTransform>,
}

// The f64 sigma is derived from the literal and never NaN.
impl Eq for HpbfvParameters {}

impl PartialEq for HpbfvParameters {
    fn eq(&self, other: &Self) -> bool {
        self.degree == other.degree
            && self.slots == other.slots
            && self.beta == other.beta
            && self.moduli_q == other.moduli_q
            && self.moduli_q_mul == other.moduli_q_mul
            && self.moduli_p == other.moduli_p
            && self.sigma == other.sigma
            && self.hamming_weight == other.hamming_weight
            && self.pow2_base == other.pow2_base
    }
}

impl Debug for HpbfvParameters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HpbfvParameters")
            .field("degree", &self.degree)
            .field("slots", &self.slots)
            .field("beta", &self.beta)
            .field("q", &self.moduli_q)
            .field("q_mul", &self.moduli_q_mul)
            .field("p", &self.moduli_p)
            .finish()
    }
}

impl HpbfvParameters {
    /// Build the parameters described by a literal.
    pub fn from_literal(literal: &HpbfvParametersLiteral) -> Result<Arc<Self>> {
        HpbfvParametersBuilder::new()
            .set_degree(literal.degree)
            .set_slots(literal.slots)
            .set_beta(literal.beta)
            .set_moduli(literal.q)
            .set_q_mul_moduli(literal.q_mul)
            .set_p_moduli(literal.p)
            .set_sigma(literal.sigma)
            .set_hamming_weight(literal.hamming_weight)
            .set_pow2_base(literal.pow2_base)
            .build_arc()
    }

    /// Returns the underlying polynomial degree.
    pub const fn degree(&self) -> usize {
        self.degree
    }

    /// Returns the number of message slots.
    pub const fn slots(&self) -> usize {
        self.slots
    }

    /// Returns the gap N / slots between slot-carrying exponents.
    pub const fn gap(&self) -> usize {
        self.gap
    }

    /// Returns the slot modulus t = beta^(N/slots) + 1.
    pub fn t(&self) -> &BigUint {
        &self.t
    }

    /// Returns the plaintext base beta used by the tensoring rescale.
    pub fn beta(&self) -> &BigUint {
        &self.beta
    }

    /// Returns the ciphertext modulus chain Q.
    pub fn moduli(&self) -> &[u64] {
        &self.moduli_q
    }

    /// Returns the auxiliary modulus chain QMul.
    pub fn q_mul_moduli(&self) -> &[u64] {
        &self.moduli_q_mul
    }

    /// Returns the special modulus chain P.
    pub fn p_moduli(&self) -> &[u64] {
        &self.moduli_p
    }

    /// Returns the context of ciphertext polynomials.
    pub fn ctx_q(&self) -> &Arc<Context> {
        &self.ctx_q
    }

    /// Returns the context of gadget polynomials, over Q x P.
    pub fn ctx_qp(&self) -> &Arc<Context> {
        &self.ctx_qp
    }

    /// Returns the context of the tensoring basis, over Q x QMul.
    pub fn ctx_qqmul(&self) -> &Arc<Context> {
        &self.ctx_qqmul
    }

    /// Returns the standard deviation of the error distribution.
    pub const fn sigma(&self) -> f64 {
        self.sigma
    }

    /// Returns the rejection bound (6 sigma) of the error distribution.
    pub const fn gaussian_bound(&self) -> i64 {
        self.gaussian_bound
    }

    /// Returns the Hamming weight of the ternary secrets.
    pub const fn hamming_weight(&self) -> usize {
        self.hamming_weight
    }

    /// Returns the base-2 logarithm of the power-of-two gadget refinement.
    pub const fn pow2_base(&self) -> usize {
        self.pow2_base
    }

    /// Returns the number of RNS gadget digits.
    pub const fn decomp_rns(&self) -> usize {
        self.decomp_rns
    }

    /// Returns the number of power-of-two gadget digits per RNS digit.
    pub const fn decomp_pw2(&self) -> usize {
        self.decomp_pw2
    }

    /// Returns the gadget vector residues P * garner_i * 2^(j * base) over
    /// the moduli of Q x P.
    pub fn gadget_vector(&self, i: usize, j: usize) -> &[u64] {
        &self.gadget_vectors[i][j]
    }

    /// Returns the Galois element performing a column rotation by k.
    pub fn galois_element_for_column_rotation(&self, k: usize) -> usize {
        let m = 2 * self.degree;
        let base = (1 + 2 * self.gap) % m;
        let mut acc = 1usize;
        for _ in 0..k {
            acc = (acc * base) % m;
        }
        acc
    }
}

/// Builder for parameters of the hpbfv encryption scheme.
#[derive(Debug)]
pub struct HpbfvParametersBuilder {
    degree: usize,
    slots: usize,
    beta: u64,
    q: Vec<u64>,
    q_mul: Vec<u64>,
    p: Vec<u64>,
    sigma: f64,
    hamming_weight: usize,
    pow2_base: usize,
}

impl HpbfvParametersBuilder {
    /// Creates a new instance of the builder.
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            degree: Default::default(),
            slots: Default::default(),
            beta: Default::default(),
            q: Default::default(),
            q_mul: Default::default(),
            p: Default::default(),
            sigma: 3.2,
            hamming_weight: Default::default(),
            pow2_base: 0,
        }
    }

    /// Sets the polynomial degree.
    pub fn set_degree(&mut self, degree: usize) -> &mut Self {
        self.degree = degree;
        self
    }

    /// Sets the number of message slots.
    pub fn set_slots(&mut self, slots: usize) -> &mut Self {
        self.slots = slots;
        self
    }

    /// Sets the plaintext base beta.
    pub fn set_beta(&mut self, beta: u64) -> &mut Self {
        self.beta = beta;
        self
    }

    /// Sets the ciphertext moduli to use.
    pub fn set_moduli(&mut self, moduli: &[u64]) -> &mut Self {
        moduli.clone_into(&mut self.q);
        self
    }

    /// Sets the auxiliary tensoring moduli to use.
    pub fn set_q_mul_moduli(&mut self, moduli: &[u64]) -> &mut Self {
        moduli.clone_into(&mut self.q_mul);
        self
    }

    /// Sets the special gadget moduli to use.
    pub fn set_p_moduli(&mut self, moduli: &[u64]) -> &mut Self {
        moduli.clone_into(&mut self.p);
        self
    }

    /// Sets the standard deviation of the error distribution.
    pub fn set_sigma(&mut self, sigma: f64) -> &mut Self {
        self.sigma = sigma;
        self
    }

    /// Sets the Hamming weight of the ternary secrets.
    pub fn set_hamming_weight(&mut self, hamming_weight: usize) -> &mut Self {
        self.hamming_weight = hamming_weight;
        self
    }

    /// Sets the base-2 logarithm of the power-of-two gadget refinement.
    pub fn set_pow2_base(&mut self, pow2_base: usize) -> &mut Self {
        self.pow2_base = pow2_base;
        self
    }

    /// Build a new `HpbfvParameters` inside an `Arc`.
    pub fn build_arc(&self) -> Result<Arc<HpbfvParameters>> {
        self.build().map(Arc::new)
    }

    /// Build a new `HpbfvParameters` struct.
    pub fn build(&self) -> Result<HpbfvParameters> {
        if self.degree < 8 || !self.degree.is_power_of_two() {
            return Err(ParametersError::InvalidDegree(self.degree).into());
        }
        if self.slots < 2 || !self.slots.is_power_of_two() || self.slots >= self.degree {
            return Err(ParametersError::InvalidSlots(format!(
                "{} is not a power of two smaller than the degree",
                self.slots
            ))
            .into());
        }
        let gap = self.degree / self.slots;
        if gap % 2 != 0 {
            return Err(ParametersError::InvalidSlots(
                "the gap N / slots must be even".to_string(),
            )
            .into());
        }
        if self.beta < 2 {
            return Err(ParametersError::InvalidPlaintextBase(format!(
                "{} is smaller than 2",
                self.beta
            ))
            .into());
        }

        let beta = BigUint::from(self.beta);
        let t = beta.pow(gap as u32) + 1u64;
        if !spdz_util::is_prime_big(&t) {
            return Err(ParametersError::InvalidPlaintextBase(format!(
                "{}^{} + 1 is not prime",
                self.beta, gap
            ))
            .into());
        }
        if ((&t - 1u64) % (self.slots as u64)).to_u64() != Some(0) {
            return Err(ParametersError::InvalidSlots(
                "the slot count does not divide t - 1".to_string(),
            )
            .into());
        }

        if self.q.is_empty() || self.q_mul.is_empty() || self.p.is_empty() {
            return Err(ParametersError::InvalidModuli(
                "the Q, QMul and P chains must be non-empty".to_string(),
            )
            .into());
        }
        for m in self
            .q
            .iter()
            .chain(self.q_mul.iter())
            .chain(self.p.iter())
        {
            if (&t % *m).is_zero() {
                return Err(ParametersError::InvalidModuli(format!(
                    "modulus {m} divides the slot modulus t"
                ))
                .into());
            }
        }

        let ctx_q = Context::new_arc(&self.q, self.degree)?;
        let ctx_qp = Context::new_arc(&[&self.q[..], &self.p[..]].concat(), self.degree)?;
        let ctx_qqmul =
            Context::new_arc(&[&self.q[..], &self.q_mul[..]].concat(), self.degree)?;

        if self.sigma <= 0.0 {
            return Err(ParametersError::InvalidNoise(format!(
                "sigma = {} is not positive",
                self.sigma
            ))
            .into());
        }
        if self.hamming_weight == 0 || self.hamming_weight > self.degree {
            return Err(ParametersError::InvalidNoise(format!(
                "hamming weight = {} is not in [1, degree]",
                self.hamming_weight
            ))
            .into());
        }
        let gaussian_bound = (6.0 * self.sigma).ceil() as i64;

        let decomp_rns = self.q.len();
        let max_q_bits = self
            .q
            .iter()
            .map(|m| 64 - m.leading_zeros() as usize)
            .max()
            .unwrap();
        let decomp_pw2 = if self.pow2_base == 0 {
            1
        } else {
            max_q_bits.div_ceil(self.pow2_base)
        };

        let q_big = ctx_q.modulus().clone();
        let p_big = self.p.iter().fold(BigUint::from(1u64), |acc, m| acc * *m);
        let q_mul_big = self
            .q_mul
            .iter()
            .fold(BigUint::from(1u64), |acc, m| acc * *m);

        // Delta(x) = round(-(Q/t) sum_u beta^(gap-1-u) x^(u*slots)).
        let mut delta_coeffs = vec![BigInt::from(0); self.degree];
        for u in 0..gap {
            let num = -BigInt::from(&q_big * beta.pow((gap - 1 - u) as u32));
            delta_coeffs[u * self.slots] = round_div(num, &t);
        }
        let mut delta = Poly::try_convert_from(
            &delta_coeffs as &[BigInt],
            &ctx_q,
            Representation::PowerBasis,
        )?;
        delta.change_representation(Representation::NttMontgomery);

        let one = BigUint::from(1u64);
        let extender_qmul = Scaler::new(
            &ctx_q,
            &ctx_qqmul,
            ScalingFactor::new(&q_mul_big, &q_big),
        )?;
        let lifter_qmul = Scaler::new(&ctx_q, &ctx_qqmul, ScalingFactor::one())?;
        let down_scaler_qmul =
            Scaler::new(&ctx_qqmul, &ctx_q, ScalingFactor::new(&one, &q_mul_big))?;
        let down_scaler_p = Scaler::new(&ctx_qp, &ctx_q, ScalingFactor::new(&one, &p_big))?;

        // Gadget vector residues P * garner_i * 2^(j * base) over Q x P.
        let qp_big = ctx_qp.modulus();
        let mut gadget_vectors = Vec::with_capacity(decomp_rns);
        for i in 0..decomp_rns {
            let garner_i = ctx_q.rns().get_garner(i).unwrap();
            let mut row = Vec::with_capacity(decomp_pw2);
            for j in 0..decomp_pw2 {
                let g = ((&p_big * garner_i) << (j * self.pow2_base)) % qp_big;
                let residues = ctx_qp
                    .moduli()
                    .iter()
                    .map(|m| (&g % *m).to_u64().unwrap())
                    .collect::<Vec<_>>()
                    .into_boxed_slice();
                row.push(residues);
            }
            gadget_vectors.push(row);
        }

        let slot_transform = Arc::new(SlotTransform::new(&t, &beta, self.slots, gap)?);

        Ok(HpbfvParameters {
            degree: self.degree,
            slots: self.slots,
            gap,
            beta,
            t,
            sigma: self.sigma,
            gaussian_bound,
            hamming_weight: self.hamming_weight,
            pow2_base: self.pow2_base,
            decomp_rns,
            decomp_pw2,
            moduli_q: self.q.clone().into_boxed_slice(),
            moduli_q_mul: self.q_mul.clone().into_boxed_slice(),
            moduli_p: self.p.clone().into_boxed_slice(),
            ctx_q,
            ctx_qp,
            ctx_qqmul,
            delta,
            extender_qmul,
            lifter_qmul,
            down_scaler_qmul,
            down_scaler_p,
            gadget_vectors,
            slot_transform,
        })
    }
}

/// Rounding division of a signed value by a positive modulus, with ties
/// toward positive infinity.
pub(crate) fn round_div(x: BigInt, d: &BigUint) -> BigInt {
    let d = BigInt::from(d.clone());
    let num: BigInt = (x << 1) + &d;
    let den = d << 1;
    let mut q = &num / &den;
    if num.sign() == Sign::Minus && &q * &den != num {
        q -= 1;
    }
    q
}

#[cfg(test)]
mod tests {
    use super::{round_div, HpbfvParameters, HpbfvParametersBuilder, HEMI, HPN13D10T128, SOHO};
    use num_bigint::{BigInt, BigUint};

    #[test]
    fn rounding() {
        let d = BigUint::from(10u64);
        assert_eq!(round_div(BigInt::from(14), &d), BigInt::from(1));
        assert_eq!(round_div(BigInt::from(15), &d), BigInt::from(2));
        assert_eq!(round_div(BigInt::from(-14), &d), BigInt::from(-1));
        assert_eq!(round_div(BigInt::from(-15), &d), BigInt::from(-1));
        assert_eq!(round_div(BigInt::from(-16), &d), BigInt::from(-2));
        assert_eq!(round_div(BigInt::from(0), &d), BigInt::from(0));
    }

    #[test]
    fn presets() {
        for literal in [&SOHO, &HEMI, &HPN13D10T128] {
            let par = HpbfvParameters::from_literal(literal).unwrap();
            assert_eq!(par.degree(), literal.degree);
            assert_eq!(par.slots(), literal.slots);
            assert_eq!(par.gap(), literal.degree / literal.slots);
            assert_eq!(
                par.t(),
                &(BigUint::from(literal.beta).pow((literal.degree / literal.slots) as u32)
                    + 1u64)
            );
            assert_eq!(par.decomp_rns(), literal.q.len());
            if literal.pow2_base == 0 {
                assert_eq!(par.decomp_pw2(), 1);
            } else {
                assert!(par.decomp_pw2() > 1);
            }
        }
    }

    #[test]
    fn galois_elements() {
        let par = HpbfvParameters::from_literal(&HEMI).unwrap();
        assert_eq!(par.galois_element_for_column_rotation(0), 1);
        let g = par.galois_element_for_column_rotation(1);
        assert_eq!(g, 1 + 2 * par.gap());
        assert_eq!(g % 2, 1);
        let g2 = par.galois_element_for_column_rotation(2);
        assert_eq!(g2, (g * g) % (2 * par.degree()));
    }

    #[test]
    fn invalid_builders() {
        // Invalid degree.
        assert!(HpbfvParametersBuilder::new().set_degree(10).build().is_err());
        // beta^gap + 1 = 2^32 + 1 is not prime.
        assert!(HpbfvParametersBuilder::new()
            .set_degree(2048)
            .set_slots(128)
            .set_beta(4)
            .set_moduli(HEMI.q)
            .set_q_mul_moduli(HEMI.q_mul)
            .set_p_moduli(HEMI.p)
            .set_hamming_weight(64)
            .build()
            .is_err());
        // Missing moduli.
        assert!(HpbfvParametersBuilder::new()
            .set_degree(2048)
            .set_slots(128)
            .set_beta(44)
            .set_hamming_weight(64)
            .build()
            .is_err());
    }
}
