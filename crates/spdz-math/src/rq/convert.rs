//! Conversions of polynomials from and to other types.

use super::{traits::TryConvertFrom, Context, Poly, Representation};
use crate::Result;
use itertools::izip;
use num_bigint::{BigInt, BigUint, Sign};
use num_traits::ToPrimitive;
use std::sync::Arc;

impl TryConvertFrom<&[i64]> for Poly {
    fn try_convert_from(
        value: &[i64],
        ctx: &Arc<Context>,
        representation: Representation,
    ) -> Result<Self> {
        debug_assert_eq!(value.len(), ctx.degree);
        let mut p = Poly::zero(ctx, Representation::PowerBasis);
        izip!(p.coefficients.outer_iter_mut(), ctx.q.iter()).for_each(|(mut row, qi)| {
            izip!(row.iter_mut(), value.iter()).for_each(|(ri, vi)| *ri = qi.reduce_i64(*vi))
        });
        if representation != Representation::PowerBasis {
            p.change_representation(representation);
        }
        Ok(p)
    }
}

impl TryConvertFrom<&[u64]> for Poly {
    fn try_convert_from(
        value: &[u64],
        ctx: &Arc<Context>,
        representation: Representation,
    ) -> Result<Self> {
        debug_assert_eq!(value.len(), ctx.degree);
        let mut p = Poly::zero(ctx, Representation::PowerBasis);
        izip!(p.coefficients.outer_iter_mut(), ctx.q.iter()).for_each(|(mut row, qi)| {
            izip!(row.iter_mut(), value.iter()).for_each(|(ri, vi)| *ri = qi.reduce(*vi))
        });
        if representation != Representation::PowerBasis {
            p.change_representation(representation);
        }
        Ok(p)
    }
}

impl TryConvertFrom<&[BigInt]> for Poly {
    fn try_convert_from(
        value: &[BigInt],
        ctx: &Arc<Context>,
        representation: Representation,
    ) -> Result<Self> {
        debug_assert_eq!(value.len(), ctx.degree);
        let mut p = Poly::zero(ctx, Representation::PowerBasis);
        izip!(p.coefficients.outer_iter_mut(), ctx.q.iter()).for_each(|(mut row, qi)| {
            let m = BigInt::from(qi.modulus());
            izip!(row.iter_mut(), value.iter()).for_each(|(ri, vi)| {
                let mut r = vi % &m;
                if r.sign() == Sign::Minus {
                    r += &m;
                }
                *ri = r.to_u64().unwrap();
            })
        });
        if representation != Representation::PowerBasis {
            p.change_representation(representation);
        }
        Ok(p)
    }
}

impl From<&Poly> for Vec<BigUint> {
    /// CRT-lift each coefficient of a PowerBasis polynomial into [0, q).
    fn from(p: &Poly) -> Self {
        debug_assert_eq!(p.representation, Representation::PowerBasis);
        (0..p.ctx.degree)
            .map(|j| p.ctx.rns.lift(p.coefficients.column(j)))
            .collect()
    }
}

impl From<&Poly> for Vec<BigInt> {
    /// CRT-lift each coefficient of a PowerBasis polynomial into the centered
    /// interval (-q/2, q/2].
    fn from(p: &Poly) -> Self {
        debug_assert_eq!(p.representation, Representation::PowerBasis);
        let q = p.ctx.modulus();
        let half = q >> 1;
        (0..p.ctx.degree)
            .map(|j| {
                let v = p.ctx.rns.lift(p.coefficients.column(j));
                if v > half {
                    BigInt::from(v) - BigInt::from(q.clone())
                } else {
                    BigInt::from(v)
                }
            })
            .collect()
    }
}
