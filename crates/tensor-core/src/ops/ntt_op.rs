// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Number-theoretic transforms over the second axis of `[l, m, r, k]` tensors.
//!
//! Each `(l, r, k)` lane is an independent length-`m` transform modulo
//! `p[k]` using twiddle row `k`. The forward transform is an in-place
//! Cooley-Tukey butterfly network followed by the output permutation
//! `result[u] = x[perm[u]]`; the inverse scatters through `perm` first,
//! runs the Gentleman-Sande network and scales by `m_inv[k]`. With
//! bit-reversed twiddle tables the pair is a negacyclic NTT and its inverse.

use super::modular_op::reduce;
use super::require_integer;
use crate::{DeviceTensor, Shape, TensorError};

/// Modulus, permutation and twiddle tables shared by [`ntt`] and [`intt`].
#[derive(Debug, Clone, Copy)]
pub struct NttTables<'a> {
    /// Moduli, shape `[k]`.
    pub p: &'a DeviceTensor,
    /// Output permutation, shape `[m]`.
    pub perm: &'a DeviceTensor,
    /// Twiddle factors (inverse twiddles for [`intt`]), shape `[k, m]`.
    pub twiddles: &'a DeviceTensor,
}

/// Forward transform of `a` into `out`. Lanes are spread over `threads`
/// scoped worker threads.
pub fn ntt(
    a: &DeviceTensor,
    tables: NttTables<'_>,
    out: &DeviceTensor,
    threads: usize,
) -> Result<(), TensorError> {
    let plan = Plan::new("ntt", a, &tables, out)?;
    let mut values = a.values();
    plan.run(&mut values, threads, |lane, t| {
        forward_lane(lane, plan.moduli[t], plan.twiddle_row(t));
        let permuted: Vec<i64> = plan.perm.iter().map(|&src| lane[src]).collect();
        lane.copy_from_slice(&permuted);
    });
    out.write_values(&values)
}

/// Inverse transform of `a` into `out`, scaling lane `k` by `m_inv[k]`.
pub fn intt(
    a: &DeviceTensor,
    tables: NttTables<'_>,
    m_inv: &DeviceTensor,
    out: &DeviceTensor,
    threads: usize,
) -> Result<(), TensorError> {
    const OP: &str = "intt";
    let plan = Plan::new(OP, a, &tables, out)?;
    if m_inv.shape() != Shape::vector(plan.k) {
        return Err(TensorError::ShapeMismatch {
            op: OP,
            lhs: m_inv.shape(),
            rhs: Shape::vector(plan.k),
        });
    }
    let scale = m_inv.values();
    let mut values = a.values();
    plan.run(&mut values, threads, |lane, t| {
        let mut scattered = vec![0i64; lane.len()];
        for (u, &dst) in plan.perm.iter().enumerate() {
            scattered[dst] = lane[u];
        }
        let p = plan.moduli[t];
        inverse_lane(&mut scattered, p, plan.twiddle_row(t));
        for (dst, v) in lane.iter_mut().zip(scattered) {
            *dst = reduce(v as i128 * scale[t] as i128, p);
        }
    });
    out.write_values(&values)
}

struct Plan {
    l: usize,
    m: usize,
    r: usize,
    k: usize,
    moduli: Vec<i64>,
    perm: Vec<usize>,
    twiddles: Vec<i64>,
}

impl Plan {
    fn new(
        op: &'static str,
        a: &DeviceTensor,
        tables: &NttTables<'_>,
        out: &DeviceTensor,
    ) -> Result<Self, TensorError> {
        require_integer(op, a)?;
        let shape = a.shape();
        let [l, m, r, k] = match *shape.dims() {
            [l, m, r, k] => [l, m, r, k],
            _ => {
                return Err(TensorError::InvalidArgument {
                    op,
                    detail: format!("input must have shape [l, m, r, k], got {shape}"),
                })
            }
        };
        if out.shape() != shape {
            return Err(TensorError::ShapeMismatch {
                op,
                lhs: shape,
                rhs: out.shape(),
            });
        }
        if !m.is_power_of_two() {
            return Err(TensorError::InvalidArgument {
                op,
                detail: format!("transform length {m} is not a power of two"),
            });
        }
        expect_shape(op, tables.p, Shape::vector(k))?;
        expect_shape(op, tables.perm, Shape::vector(m))?;
        expect_shape(op, tables.twiddles, Shape::new(vec![k, m]))?;

        let moduli = tables.p.values();
        if let Some(bad) = moduli.iter().find(|&&q| q <= 0) {
            return Err(TensorError::InvalidArgument {
                op,
                detail: format!("modulus must be positive, got {bad}"),
            });
        }
        let perm = tables
            .perm
            .values()
            .into_iter()
            .map(|v| {
                usize::try_from(v).ok().filter(|&i| i < m).ok_or_else(|| {
                    TensorError::InvalidArgument {
                        op,
                        detail: format!("permutation index {v} out of range for length {m}"),
                    }
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            l,
            m,
            r,
            k,
            moduli,
            perm,
            twiddles: tables.twiddles.values(),
        })
    }

    fn twiddle_row(&self, t: usize) -> &[i64] {
        &self.twiddles[t * self.m..(t + 1) * self.m]
    }

    fn index(&self, i: usize, u: usize, j: usize, t: usize) -> usize {
        ((i * self.m + u) * self.r + j) * self.k + t
    }

    /// Gathers every lane, transforms it with `f(lane, k_index)` and scatters
    /// the results back into `values`.
    fn run<F>(&self, values: &mut [i64], threads: usize, f: F)
    where
        F: Fn(&mut [i64], usize) + Sync,
    {
        let lanes: Vec<(usize, usize, usize)> = (0..self.l)
            .flat_map(|i| (0..self.r).flat_map(move |j| (0..self.k).map(move |t| (i, j, t))))
            .collect();
        if lanes.is_empty() || self.m == 0 {
            return;
        }
        let mut columns: Vec<Vec<i64>> = lanes
            .iter()
            .map(|&(i, j, t)| (0..self.m).map(|u| values[self.index(i, u, j, t)]).collect())
            .collect();

        let workers = threads.clamp(1, lanes.len());
        let chunk = lanes.len().div_ceil(workers);
        if workers == 1 {
            for (column, &(_, _, t)) in columns.iter_mut().zip(&lanes) {
                f(column, t);
            }
        } else {
            std::thread::scope(|scope| {
                for (cols, ids) in columns.chunks_mut(chunk).zip(lanes.chunks(chunk)) {
                    let f = &f;
                    scope.spawn(move || {
                        for (column, &(_, _, t)) in cols.iter_mut().zip(ids) {
                            f(column, t);
                        }
                    });
                }
            });
        }

        for (column, &(i, j, t)) in columns.iter().zip(&lanes) {
            for (u, &v) in column.iter().enumerate() {
                values[self.index(i, u, j, t)] = v;
            }
        }
    }
}

fn expect_shape(op: &'static str, t: &DeviceTensor, expected: Shape) -> Result<(), TensorError> {
    if t.shape() != expected {
        return Err(TensorError::ShapeMismatch {
            op,
            lhs: t.shape(),
            rhs: expected,
        });
    }
    Ok(())
}

fn forward_lane(x: &mut [i64], p: i64, tw: &[i64]) {
    let n = x.len();
    let mut step = n;
    let mut stage = 1;
    while stage < n {
        step /= 2;
        for u in 0..stage {
            let j1 = 2 * u * step;
            let s = tw[stage + u];
            for jx in j1..j1 + step {
                let a = x[jx];
                let v = reduce(x[jx + step] as i128 * s as i128, p);
                x[jx] = reduce(a as i128 + v as i128, p);
                x[jx + step] = reduce(a as i128 - v as i128, p);
            }
        }
        stage *= 2;
    }
}

fn inverse_lane(x: &mut [i64], p: i64, inv_tw: &[i64]) {
    let n = x.len();
    let mut stride = 1;
    let mut half = n / 2;
    while half >= 1 {
        for tid in 0..n / 2 {
            let group = tid / stride;
            let iu = group * stride * 2 + tid % stride;
            let iv = iu + stride;
            let s = inv_tw[half + group];
            let (a, b) = (x[iu], x[iv]);
            x[iu] = reduce(a as i128 + b as i128, p);
            x[iv] = reduce((a as i128 - b as i128) * s as i128, p);
        }
        stride *= 2;
        half /= 2;
    }
}
