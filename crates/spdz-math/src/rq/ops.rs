//! Implementations of operations over polynomials.

use super::{Poly, Representation};
use itertools::izip;
use num_bigint::BigUint;
use num_traits::ToPrimitive;
use std::ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub, SubAssign};

impl AddAssign<&Poly> for Poly {
    fn add_assign(&mut self, p: &Poly) {
        assert_eq!(self.ctx, p.ctx, "Incompatible contexts");
        assert_eq!(
            self.representation, p.representation,
            "Incompatible representations"
        );
        izip!(
            self.coefficients.outer_iter_mut(),
            p.coefficients.outer_iter(),
            self.ctx.q.iter()
        )
        .for_each(|(mut v1, v2, qi)| {
            qi.add_vec(v1.as_slice_mut().unwrap(), v2.as_slice().unwrap())
        });
    }
}

impl Add<&Poly> for &Poly {
    type Output = Poly;
    fn add(self, p: &Poly) -> Poly {
        let mut q = self.clone();
        q += p;
        q
    }
}

impl SubAssign<&Poly> for Poly {
    fn sub_assign(&mut self, p: &Poly) {
        assert_eq!(self.ctx, p.ctx, "Incompatible contexts");
        assert_eq!(
            self.representation, p.representation,
            "Incompatible representations"
        );
        izip!(
            self.coefficients.outer_iter_mut(),
            p.coefficients.outer_iter(),
            self.ctx.q.iter()
        )
        .for_each(|(mut v1, v2, qi)| {
            qi.sub_vec(v1.as_slice_mut().unwrap(), v2.as_slice().unwrap())
        });
    }
}

impl Sub<&Poly> for &Poly {
    type Output = Poly;
    fn sub(self, p: &Poly) -> Poly {
        let mut q = self.clone();
        q -= p;
        q
    }
}

impl Neg for &Poly {
    type Output = Poly;
    fn neg(self) -> Poly {
        let mut q = self.clone();
        izip!(q.coefficients.outer_iter_mut(), q.ctx.q.iter())
            .for_each(|(mut v, qi)| qi.neg_vec(v.as_slice_mut().unwrap()));
        q
    }
}

impl MulAssign<&Poly> for Poly {
    /// Pointwise multiplication in the NTT domain.
    ///
    /// The representation of the product follows the Montgomery algebra: the
    /// product of two Montgomery-form operands is in Montgomery form, while a
    /// single Montgomery-form operand absorbs the 2^-64 factor and yields a
    /// plain Ntt product. Multiplying two plain Ntt polynomials is supported
    /// by lifting the receiver on the fly.
    fn mul_assign(&mut self, p: &Poly) {
        assert_eq!(self.ctx, p.ctx, "Incompatible contexts");
        let out_representation = match (self.representation, p.representation) {
            (Representation::Ntt, Representation::Ntt) => {
                // Lift the receiver in Montgomery form so that the pointwise
                // Montgomery product is plain.
                izip!(self.coefficients.outer_iter_mut(), self.ctx.q.iter())
                    .for_each(|(mut v, qi)| qi.mform_vec(v.as_slice_mut().unwrap()));
                Representation::Ntt
            }
            (Representation::Ntt, Representation::NttMontgomery)
            | (Representation::NttMontgomery, Representation::Ntt) => Representation::Ntt,
            (Representation::NttMontgomery, Representation::NttMontgomery) => {
                Representation::NttMontgomery
            }
            _ => panic!("Multiplication requires NTT-domain operands"),
        };
        izip!(
            self.coefficients.outer_iter_mut(),
            p.coefficients.outer_iter(),
            self.ctx.q.iter()
        )
        .for_each(|(mut v1, v2, qi)| {
            qi.mul_mont_vec(v1.as_slice_mut().unwrap(), v2.as_slice().unwrap())
        });
        self.representation = out_representation;
    }
}

impl Mul<&Poly> for &Poly {
    type Output = Poly;
    fn mul(self, p: &Poly) -> Poly {
        let mut q = self.clone();
        q *= p;
        q
    }
}

impl MulAssign<&BigUint> for Poly {
    /// Multiplication by a scalar; the representation is preserved.
    fn mul_assign(&mut self, s: &BigUint) {
        izip!(self.coefficients.outer_iter_mut(), self.ctx.q.iter()).for_each(|(mut v, qi)| {
            let si = (s % qi.modulus()).to_u64().unwrap();
            qi.scalar_mul_vec(v.as_slice_mut().unwrap(), si)
        });
    }
}

impl Mul<&BigUint> for &Poly {
    type Output = Poly;
    fn mul(self, s: &BigUint) -> Poly {
        let mut q = self.clone();
        q *= s;
        q
    }
}

#[cfg(test)]
mod tests {
    use crate::rq::{traits::TryConvertFrom, Context, Poly, Representation};
    use num_bigint::BigUint;
    use rand::thread_rng;
    use std::error::Error;

    const MODULI: &[u64] = &[1153, 4611686018326724609, 4611686018309947393];

    #[test]
    fn add_sub_neg() -> Result<(), Box<dyn Error>> {
        let mut rng = thread_rng();
        let ctx = Context::new_arc(MODULI, 16)?;
        for _ in 0..20 {
            let p = Poly::random(&ctx, Representation::PowerBasis, &mut rng);
            let q = Poly::random(&ctx, Representation::PowerBasis, &mut rng);

            let r = &p + &q;
            let s = &r - &q;
            assert_eq!(s, p);

            let t = &(-&p) + &p;
            assert_eq!(t, Poly::zero(&ctx, Representation::PowerBasis));
        }
        Ok(())
    }

    #[test]
    fn mul_representations() -> Result<(), Box<dyn Error>> {
        let mut rng = thread_rng();
        let ctx = Context::new_arc(MODULI, 16)?;
        for _ in 0..20 {
            let p = Poly::random(&ctx, Representation::Ntt, &mut rng);
            let q = Poly::random(&ctx, Representation::Ntt, &mut rng);

            // Plain x plain.
            let r = &p * &q;
            assert_eq!(r.representation(), &Representation::Ntt);

            // Montgomery x plain gives the same plain product.
            let mut p_mont = p.clone();
            p_mont.change_representation(Representation::NttMontgomery);
            let r2 = &p_mont * &q;
            assert_eq!(r2.representation(), &Representation::Ntt);
            assert_eq!(r, r2);

            // Montgomery x Montgomery stays in Montgomery form.
            let mut q_mont = q.clone();
            q_mont.change_representation(Representation::NttMontgomery);
            let mut r3 = &p_mont * &q_mont;
            assert_eq!(r3.representation(), &Representation::NttMontgomery);
            r3.change_representation(Representation::Ntt);
            assert_eq!(r, r3);
        }
        Ok(())
    }

    #[test]
    fn mul_is_negacyclic() -> Result<(), Box<dyn Error>> {
        let ctx = Context::new_arc(MODULI, 16)?;
        // (x^15)^2 = x^30 = -x^14.
        let mut a = vec![0u64; 16];
        a[15] = 1;
        let mut p = Poly::try_convert_from(&a as &[u64], &ctx, Representation::Ntt)?;
        let q = p.clone();
        p *= &q;
        p.change_representation(Representation::PowerBasis);
        let v = Vec::<BigUint>::from(&p);
        assert_eq!(v[14], ctx.modulus() - 1u64);
        Ok(())
    }

    #[test]
    fn scalar_mul() -> Result<(), Box<dyn Error>> {
        let mut rng = thread_rng();
        let ctx = Context::new_arc(MODULI, 16)?;
        let p = Poly::random(&ctx, Representation::PowerBasis, &mut rng);

        let two = BigUint::from(2u64);
        let q = &p * &two;
        assert_eq!(q, &p + &p);

        // Multiplying a Montgomery-form polynomial by a scalar keeps the
        // Montgomery form.
        let mut p_mont = p.clone();
        p_mont.change_representation(Representation::NttMontgomery);
        let mut q2 = &p_mont * &two;
        assert_eq!(q2.representation(), &Representation::NttMontgomery);
        q2.change_representation(Representation::PowerBasis);
        assert_eq!(q2, q);

        Ok(())
    }
}
