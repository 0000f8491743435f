//! Fair division of an amount.
//!
//! `amount / n` goes to everyone and the `amount % n` left-over pence go one
//! each to participants picked by a fresh uniform permutation, so the extra
//! penny does not always land on the same position of the participant list.

use rand::{Rng, seq::SliceRandom};

use crate::{LedgerError, Pence, ResultLedger};

/// Splits `amount` into `n` shares that sum exactly to `amount`.
///
/// Share `i` belongs to participant `i`. Fails with `NegativePence` for a
/// negative amount and `NoParticipants` when `n` is zero.
pub fn split_amount<R: Rng + ?Sized>(
    amount: Pence,
    n: usize,
    rng: &mut R,
) -> ResultLedger<Vec<Pence>> {
    if amount.is_negative() {
        return Err(LedgerError::NegativePence(amount));
    }
    if n == 0 {
        return Err(LedgerError::NoParticipants);
    }

    let total = amount.pence();
    let count = n as i64;
    let average = total / count;
    let remainder = (total % count) as usize;

    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(rng);

    let mut shares = vec![Pence::new(average); n];
    for &index in order.iter().take(remainder) {
        shares[index] += Pence::new(1);
    }
    Ok(shares)
}
