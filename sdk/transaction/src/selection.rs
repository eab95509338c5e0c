//! Coin selection and spend plans.
//!
//! Smallest notes go first, so dust is consolidated as the wallet spends.

use obscura_ledger::Felt;
use obscura_privacy::{Keypair, Note, NoteValue};
use rand::{CryptoRng, RngCore};
use tracing::debug;

use crate::assembler::{MAX_INPUTS, OUTPUTS, TransactionRequest};
use crate::error::TransactionError;
use crate::payload::Account;

/// Notes chosen to cover a spend.
#[derive(Debug, Clone)]
pub struct Selection {
    pub notes: Vec<Note>,
    pub total: NoteValue,
}

impl Selection {
    /// Leftover after paying `required`.
    pub fn change(&self, required: NoteValue) -> NoteValue {
        self.total.checked_sub(required).unwrap_or(NoteValue::ZERO)
    }
}

/// Accumulate candidates in ascending amount order until `required` is covered.
///
/// When that takes more than `MAX_INPUTS` notes, the largest notes are
/// taken first instead, which needs the fewest notes possible.
pub fn select_inputs(
    candidates: &[Note],
    required: NoteValue,
) -> Result<Selection, TransactionError> {
    let mut sorted: Vec<&Note> = candidates.iter().collect();
    sorted.sort_by_key(|note| note.amount());

    let mut selection = accumulate(sorted.iter().copied(), required)?;
    if selection.total < required {
        return Err(TransactionError::InsufficientInputValue {
            required,
            available: selection.total,
        });
    }

    if selection.notes.len() > MAX_INPUTS {
        debug!(
            selected = selection.notes.len(),
            "smallest-first selection over the input limit, taking largest first"
        );
        selection = accumulate(sorted.iter().rev().copied(), required)?;
        if selection.notes.len() > MAX_INPUTS {
            return Err(TransactionError::TooManyInputsOrOutputs {
                inputs: selection.notes.len(),
                outputs: OUTPUTS,
                max_inputs: MAX_INPUTS,
                max_outputs: OUTPUTS,
            });
        }
    }

    debug!(selected = selection.notes.len(), total = %selection.total, required = %required, "selected inputs");
    Ok(selection)
}

fn accumulate<'a>(
    ordered: impl Iterator<Item = &'a Note>,
    required: NoteValue,
) -> Result<Selection, TransactionError> {
    let mut notes = Vec::new();
    let mut total = NoteValue::ZERO;
    for note in ordered {
        if total >= required && !notes.is_empty() {
            break;
        }
        total = total
            .checked_add(note.amount())
            .ok_or(TransactionError::AmountOverflow)?;
        notes.push(note.clone());
    }
    Ok(Selection { notes, total })
}

/// Pay `amount` to `recipient`, change back to `wallet`.
pub fn plan_transfer<R: RngCore + CryptoRng>(
    wallet: &Keypair,
    candidates: &[Note],
    recipient: &Keypair,
    amount: NoteValue,
    fee: NoteValue,
    rng: &mut R,
) -> Result<TransactionRequest, TransactionError> {
    let required = amount
        .checked_add(fee)
        .ok_or(TransactionError::AmountOverflow)?;
    let selection = select_inputs(candidates, required)?;

    let mut outputs = vec![Note::new(amount, recipient.clone(), rng)];
    let change = selection.change(required);
    if !change.is_zero() {
        outputs.push(Note::new(change, wallet.clone(), rng));
    }

    Ok(TransactionRequest::new(selection.notes, outputs).fee(fee))
}

/// Move `amount` out of the pool to `to`, change back to `wallet`.
pub fn plan_withdrawal<R: RngCore + CryptoRng>(
    wallet: &Keypair,
    candidates: &[Note],
    to: Felt,
    amount: NoteValue,
    fee: NoteValue,
    rng: &mut R,
) -> Result<TransactionRequest, TransactionError> {
    let required = amount
        .checked_add(fee)
        .ok_or(TransactionError::AmountOverflow)?;
    let selection = select_inputs(candidates, required)?;

    let mut outputs = Vec::new();
    let change = selection.change(required);
    if !change.is_zero() {
        outputs.push(Note::new(change, wallet.clone(), rng));
    }

    Ok(TransactionRequest::new(selection.notes, outputs)
        .fee(fee)
        .recipient(to))
}

/// Shield `amount` into a fresh note for `wallet`, registering its key under `owner`.
pub fn plan_deposit<R: RngCore + CryptoRng>(
    wallet: &Keypair,
    owner: Felt,
    amount: NoteValue,
    rng: &mut R,
) -> TransactionRequest {
    let note = Note::new(amount, wallet.clone(), rng);
    TransactionRequest::new(Vec::new(), vec![note]).register(Account {
        owner,
        public_key: wallet.address(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    fn notes(wallet: &Keypair, amounts: &[u128]) -> Vec<Note> {
        amounts
            .iter()
            .enumerate()
            .map(|(i, a)| Note::new(NoteValue::new(*a), wallet.clone(), &mut OsRng).with_index(i as u64))
            .collect()
    }

    #[test]
    fn test_selects_smallest_first() {
        let wallet = Keypair::generate(&mut OsRng);
        let candidates = notes(&wallet, &[50, 10, 30]);

        let selection = select_inputs(&candidates, NoteValue::new(35)).unwrap();
        let amounts: Vec<_> = selection.notes.iter().map(|n| n.amount().as_u128()).collect();
        assert_eq!(amounts, vec![10, 30]);
        assert_eq!(selection.total, NoteValue::new(40));
        assert_eq!(selection.change(NoteValue::new(35)), NoteValue::new(5));
    }

    #[test]
    fn test_insufficient() {
        let wallet = Keypair::generate(&mut OsRng);
        let candidates = notes(&wallet, &[5, 6]);
        match select_inputs(&candidates, NoteValue::new(12)) {
            Err(TransactionError::InsufficientInputValue { required, available }) => {
                assert_eq!(required, NoteValue::new(12));
                assert_eq!(available, NoteValue::new(11));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_falls_back_to_largest_notes_over_input_limit() {
        let wallet = Keypair::generate(&mut OsRng);
        let mut amounts = vec![1u128; 20];
        amounts.push(100);
        let candidates = notes(&wallet, &amounts);

        let selection = select_inputs(&candidates, NoteValue::new(30)).unwrap();
        assert_eq!(selection.notes.len(), 1);
        assert_eq!(selection.total, NoteValue::new(100));
        assert_eq!(selection.change(NoteValue::new(30)), NoteValue::new(70));
    }

    #[test]
    fn test_too_many_notes_needed() {
        let wallet = Keypair::generate(&mut OsRng);
        let candidates = notes(&wallet, &[1u128; 20]);

        let result = select_inputs(&candidates, NoteValue::new(18));
        assert!(matches!(
            result,
            Err(TransactionError::TooManyInputsOrOutputs {
                inputs: 18,
                max_inputs: MAX_INPUTS,
                ..
            })
        ));

        // sixteen dust notes still fit
        assert_eq!(select_inputs(&candidates, NoteValue::new(16)).unwrap().notes.len(), 16);
    }

    #[test]
    fn test_transfer_plan_has_change() {
        let wallet = Keypair::generate(&mut OsRng);
        let bob = Keypair::generate(&mut OsRng);
        let candidates = notes(&wallet, &[100]);

        let request = plan_transfer(
            &wallet,
            &candidates,
            &bob,
            NoteValue::new(60),
            NoteValue::ZERO,
            &mut OsRng,
        )
        .unwrap();

        assert_eq!(request.inputs.len(), 1);
        assert_eq!(request.outputs.len(), 2);
        assert_eq!(request.outputs[0].amount(), NoteValue::new(60));
        assert_eq!(request.outputs[0].owner().public_key(), bob.public_key());
        assert_eq!(request.outputs[1].amount(), NoteValue::new(40));
        assert_eq!(request.outputs[1].owner().public_key(), wallet.public_key());
    }

    #[test]
    fn test_exact_transfer_has_no_change() {
        let wallet = Keypair::generate(&mut OsRng);
        let bob = Keypair::generate(&mut OsRng);
        let candidates = notes(&wallet, &[60]);

        let request = plan_transfer(
            &wallet,
            &candidates,
            &bob,
            NoteValue::new(60),
            NoteValue::ZERO,
            &mut OsRng,
        )
        .unwrap();
        assert_eq!(request.outputs.len(), 1);
    }

    #[test]
    fn test_withdrawal_plan() {
        let wallet = Keypair::generate(&mut OsRng);
        let candidates = notes(&wallet, &[70, 20]);
        let to = Felt::from(0xcafeu64);

        let request = plan_withdrawal(
            &wallet,
            &candidates,
            to,
            NoteValue::new(80),
            NoteValue::new(2),
            &mut OsRng,
        )
        .unwrap();

        assert_eq!(request.inputs.len(), 2);
        assert_eq!(request.outputs.len(), 1);
        assert_eq!(request.outputs[0].amount(), NoteValue::new(8));
        assert_eq!(request.recipient, Some(to));
        assert_eq!(request.fee, NoteValue::new(2));
    }

    #[test]
    fn test_deposit_plan_registers() {
        let wallet = Keypair::generate(&mut OsRng);
        let request = plan_deposit(&wallet, Felt::from(0xa11cu64), NoteValue::new(5), &mut OsRng);

        assert!(request.inputs.is_empty());
        assert_eq!(request.outputs.len(), 1);
        let account = request.account.unwrap();
        assert_eq!(account.owner, Felt::from(0xa11cu64));
        assert_eq!(account.public_key, wallet.address());
    }
}
