//! Trial-division factorizer over a fixed ascending prime list.

/// Prime factors found in an integer, in ascending order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Factorization {
    /// `(prime, multiplicity)` pairs, ascending by prime.
    pub factors: Vec<(u32, u32)>,
    /// Whatever is left once the prime list can no longer divide it. `1` when
    /// the integer factored completely over the list.
    pub residual: u128,
}

impl Factorization {
    pub fn is_complete(&self) -> bool {
        self.residual <= 1
    }

    /// Total number of prime factors, counting multiplicity.
    pub fn factor_count(&self) -> u32 {
        self.factors.iter().map(|(_, count)| count).sum()
    }
}

/// Factor `n` over `primes`, which must be sorted ascending.
///
/// Division stops as soon as the square of the next candidate exceeds the
/// remaining cofactor. At that point the cofactor is either 1, a prime from the
/// list, or something the list cannot express, which is reported as `residual`.
pub fn factorize(n: u128, primes: &[u32]) -> Factorization {
    let mut factors = Vec::new();
    if n <= 1 {
        return Factorization { factors, residual: n };
    }

    let mut remaining = n;
    for &prime in primes {
        let p = prime as u128;
        if p * p > remaining {
            break;
        }
        let mut multiplicity = 0;
        while remaining % p == 0 {
            remaining /= p;
            multiplicity += 1;
        }
        if multiplicity > 0 {
            factors.push((prime, multiplicity));
        }
    }

    if remaining > 1 {
        if let Ok(prime) = u32::try_from(remaining) {
            if primes.binary_search(&prime).is_ok() {
                factors.push((prime, 1));
                remaining = 1;
            }
        }
    }

    Factorization {
        factors,
        residual: remaining,
    }
}

pub fn is_prime(n: u32) -> bool {
    if n < 2 {
        return false;
    }
    if n % 2 == 0 {
        return n == 2;
    }
    let mut divisor = 3u32;
    while (divisor as u64) * (divisor as u64) <= n as u64 {
        if n % divisor == 0 {
            return false;
        }
        divisor += 2;
    }
    true
}
