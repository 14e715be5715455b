use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rustfx::prelude::*;

fn dual_arithmetic_benchmark(c: &mut Criterion) {
    c.bench_function("dual multiply-accumulate", |b| {
        b.iter(|| {
            let a = Dual::variable(1.0, "fx_eurusd");
            let k = Dual::variable(2.0, "fx_gbpusd");
            let mut acc = &a * &k;
            for _ in 0..100_000 {
                acc = &acc * &k;
            }
            black_box(acc);
        })
    });
}

fn dual_solve_benchmark(c: &mut Criterion) {
    c.bench_function("dual_solve 8x8 FX system", |b| {
        b.iter(|| {
            let q = 8;
            let mut a = vec![vec![Dual::new(0.0); q]; q];
            let mut rhs = vec![Dual::new(0.0); q];
            a[0][0] = Dual::new(1.0);
            rhs[0] = Dual::new(1.0);
            for i in 1..q {
                let rate = Dual::variable(1.0 + i as f64 * 0.1, &format!("fx_pair{i}"));
                a[i][i - 1] = Dual::new(-1.0);
                a[i][i] = rate.recip();
            }
            black_box(dual_solve(&a, &rhs).unwrap());
        })
    });
}

criterion_group!(benches, dual_arithmetic_benchmark, dual_solve_benchmark);
criterion_main!(benches);
