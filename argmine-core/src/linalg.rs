//! # Álgebra Linear Auxiliar
//!
//! Rotinas numéricas usadas pelos redutores de dimensionalidade. Operadores
//! simétricos são passados como closures `v ↦ A·v`, o que evita materializar
//! matrizes `d × d` quando o vocabulário é grande.

use ndarray::{Array1, Array2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const POWER_MAX_ITER: usize = 500;
const POWER_TOL: f64 = 1e-10;

/// Autopar de um operador simétrico.
#[derive(Debug, Clone)]
pub struct EigenPair {
    pub value: f64,
    pub vector: Array1<f64>,
}

/// Norma euclidiana.
pub fn norm(v: &Array1<f64>) -> f64 {
    v.dot(v).sqrt()
}

/// Inverte o sinal para que a componente de maior módulo seja positiva.
pub fn normalize_sign(v: &mut Array1<f64>) {
    let pivot = v
        .iter()
        .copied()
        .fold(0.0_f64, |best, x| if x.abs() > best.abs() { x } else { best });
    if pivot < 0.0 {
        v.mapv_inplace(|x| -x);
    }
}

fn orthogonalize(v: &mut Array1<f64>, basis: &[EigenPair]) {
    for pair in basis {
        let proj = pair.vector.dot(v);
        v.scaled_add(-proj, &pair.vector);
    }
}

/// Maiores `k` autopares de um operador simétrico semidefinido positivo.
///
/// Iteração de potência com deflação por projeção:
///
/// $$ v \leftarrow \frac{P A v}{\| P A v \|}, \quad P = I - \sum_j u_j u_j^T $$
///
/// Quando o posto se esgota, os vetores restantes são completados com
/// direções ortogonais e autovalor zero.
pub fn top_eigenpairs<F>(op: F, dim: usize, k: usize, seed: u64) -> Vec<EigenPair>
where
    F: Fn(&Array1<f64>) -> Array1<f64>,
{
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut pairs: Vec<EigenPair> = Vec::with_capacity(k);

    for _ in 0..k.min(dim) {
        let mut v: Array1<f64> = Array1::from_shape_fn(dim, |_| rng.gen_range(-1.0..1.0));
        orthogonalize(&mut v, &pairs);
        let n0 = norm(&v);
        if n0 < 1e-300 {
            break;
        }
        v /= n0;

        let mut value = 0.0;
        let mut exhausted = false;
        for _ in 0..POWER_MAX_ITER {
            let mut w = op(&v);
            orthogonalize(&mut w, &pairs);
            let n = norm(&w);
            if n < 1e-12 {
                exhausted = true;
                break;
            }
            value = v.dot(&w);
            w /= n;
            let delta = (&w - &v).mapv(f64::abs).sum().min((&w + &v).mapv(f64::abs).sum());
            v = w;
            if delta < POWER_TOL {
                break;
            }
        }

        if exhausted {
            value = 0.0;
        }
        orthogonalize(&mut v, &pairs);
        let n = norm(&v);
        if n < 1e-12 {
            break;
        }
        v /= n;
        normalize_sign(&mut v);
        pairs.push(EigenPair {
            value: value.max(0.0),
            vector: v,
        });
    }
    pairs
}

/// Decomposição espectral de uma matriz simétrica pequena (método de Jacobi).
///
/// Retorna autovalores em ordem decrescente e autovetores nas colunas.
pub fn jacobi_eigen(matrix: &Array2<f64>) -> (Vec<f64>, Array2<f64>) {
    let n = matrix.nrows();
    let mut a = matrix.clone();
    let mut vectors = Array2::<f64>::eye(n);

    for _sweep in 0..100 {
        let off: f64 = (0..n)
            .flat_map(|i| (0..n).filter(move |&j| j != i).map(move |j| (i, j)))
            .map(|(i, j)| a[[i, j]] * a[[i, j]])
            .sum();
        if off < 1e-22 {
            break;
        }

        for p in 0..n {
            for q in (p + 1)..n {
                let apq = a[[p, q]];
                if apq.abs() < 1e-300 {
                    continue;
                }
                let theta = (a[[q, q]] - a[[p, p]]) / (2.0 * apq);
                let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
                let t = if theta == 0.0 { 1.0 } else { t };
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;

                for k in 0..n {
                    let akp = a[[k, p]];
                    let akq = a[[k, q]];
                    a[[k, p]] = c * akp - s * akq;
                    a[[k, q]] = s * akp + c * akq;
                }
                for k in 0..n {
                    let apk = a[[p, k]];
                    let aqk = a[[q, k]];
                    a[[p, k]] = c * apk - s * aqk;
                    a[[q, k]] = s * apk + c * aqk;
                }
                for k in 0..n {
                    let vkp = vectors[[k, p]];
                    let vkq = vectors[[k, q]];
                    vectors[[k, p]] = c * vkp - s * vkq;
                    vectors[[k, q]] = s * vkp + c * vkq;
                }
            }
        }
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&i, &j| a[[j, j]].total_cmp(&a[[i, i]]));
    let values = order.iter().map(|&i| a[[i, i]]).collect();
    let mut sorted = Array2::<f64>::zeros((n, n));
    for (dst, &src) in order.iter().enumerate() {
        sorted.column_mut(dst).assign(&vectors.column(src));
    }
    (values, sorted)
}

/// Resolve `A x = b` por gradiente conjugado (`A` simétrica definida positiva).
pub fn conjugate_gradient<F>(op: F, b: &Array1<f64>, tol: f64, max_iter: usize) -> Array1<f64>
where
    F: Fn(&Array1<f64>) -> Array1<f64>,
{
    let mut x = Array1::<f64>::zeros(b.len());
    let mut r = b.clone();
    let mut p = r.clone();
    let mut rs_old = r.dot(&r);
    let threshold = tol * tol * rs_old.max(1e-300);

    for _ in 0..max_iter {
        if rs_old <= threshold {
            break;
        }
        let ap = op(&p);
        let denom = p.dot(&ap);
        if denom.abs() < 1e-300 {
            break;
        }
        let alpha = rs_old / denom;
        x.scaled_add(alpha, &p);
        r.scaled_add(-alpha, &ap);
        let rs_new = r.dot(&r);
        p = &r + &(&p * (rs_new / rs_old));
        rs_old = rs_new;
    }
    x
}
