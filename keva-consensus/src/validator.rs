use keva_types::derive::derive_namespace;
use keva_types::primitives::bytes_from;
use keva_types::{ChainParams, Height, Key, NamespaceId, Value};
use keva_types::{ValidationError, ValidationResult};
use log::trace;

use crate::script::{parse_keva_script, KevaOp};
use crate::tx::Transaction;
use crate::view::CoinView;

/// The keva op a transaction carries, resolved to typed, length-checked
/// fields and ready for `Applier::apply_tx` (spec §4.5/§4.6).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidatedOp {
    NamespaceRegister { ns: NamespaceId, display_name: Value },
    Put { ns: NamespaceId, key: Key, value: Value },
    Delete { ns: NamespaceId, key: Key },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedTx {
    pub out_index: usize,
    pub op: ValidatedOp,
}

/// Which op the spent keva input carried, so a `Put`/`Delete` can enforce
/// spec §4.5's "`name_in` is either a `NamespaceRegister` or another
/// update" rule: a tx may not chain a write off an already-deleted
/// namespace key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NameInKind {
    Registration,
    Update,
    Delete,
}

struct NameIn {
    ns: NamespaceId,
    kind: NameInKind,
}

/// Stateless rules checking whether a transaction's keva operation is
/// well-formed with respect to a `CoinView` (spec §2 component 5, §4.5).
/// Returns `Ok(None)` for a transaction that legitimately carries no keva
/// operation.
pub struct Validator;

impl Validator {
    pub fn check_tx(tx: &Transaction, height: Height, params: &ChainParams, coin_view: &dyn CoinView) -> ValidationResult<Option<ValidatedTx>> {
        let result = Self::check_tx_inner(tx, height, params, coin_view);
        if let Err(err) = &result {
            trace!("rejected tx {:?} at height {height}: {err}", tx.hash);
        }
        result
    }

    fn check_tx_inner(tx: &Transaction, height: Height, params: &ChainParams, coin_view: &dyn CoinView) -> ValidationResult<Option<ValidatedTx>> {
        let name_in = find_name_in(tx, coin_view)?;
        let name_out = find_name_out(tx)?;

        if !tx.is_kevacoin {
            return if name_in.is_some() || name_out.is_some() { Err(ValidationError::UnexpectedKevaIo) } else { Ok(None) };
        }

        let (out_index, parsed_out) = name_out.ok_or(ValidationError::MissingKevaOutput)?;

        let locked_value = tx.outputs[out_index].value;
        if locked_value < ChainParams::KEVA_LOCKED_AMOUNT {
            return Err(ValidationError::GreedyName(locked_value, ChainParams::KEVA_LOCKED_AMOUNT));
        }

        let op = match parsed_out {
            KevaOp::Namespace { namespace, display_name } => {
                check_display_name_length(&display_name)?;
                let first_input = tx.inputs.first().ok_or(ValidationError::MissingKevaInput)?;
                let ns_fix = params.is_ns_fix_active(height);
                let derived = derive_namespace(params, &first_input.prev_outpoint.tx_hash, first_input.prev_outpoint.vout, ns_fix);
                if derived.as_ref() != namespace.as_slice() {
                    return Err(ValidationError::NamespaceDerivationMismatch);
                }
                ValidatedOp::NamespaceRegister { ns: derived, display_name: Value::new_unchecked(bytes_from(display_name)) }
            }
            KevaOp::Put { namespace, key, value } => {
                let name_in = name_in.ok_or(ValidationError::MissingKevaInput)?;
                check_key_length(&key)?;
                check_value_length(&value)?;
                require_updatable_input(&name_in)?;
                let ns = require_namespace_match(&name_in, &namespace)?;
                ValidatedOp::Put { ns, key: Key::new_unchecked(bytes_from(key)), value: Value::new_unchecked(bytes_from(value)) }
            }
            KevaOp::Delete { namespace, key } => {
                let name_in = name_in.ok_or(ValidationError::MissingKevaInput)?;
                check_key_length(&key)?;
                require_updatable_input(&name_in)?;
                let ns = require_namespace_match(&name_in, &namespace)?;
                ValidatedOp::Delete { ns, key: Key::new_unchecked(bytes_from(key)) }
            }
        };

        Ok(Some(ValidatedTx { out_index, op }))
    }
}

/// spec §4.5: `Put`/`Delete` may only chain off a `NamespaceRegister` or a
/// prior `Put` — not off a `Delete`, which spends the keva input without
/// leaving anything left to update.
fn require_updatable_input(name_in: &NameIn) -> ValidationResult<()> {
    match name_in.kind {
        NameInKind::Registration | NameInKind::Update => Ok(()),
        NameInKind::Delete => Err(ValidationError::InvalidInputChain),
    }
}

fn require_namespace_match(name_in: &NameIn, declared: &[u8]) -> ValidationResult<NamespaceId> {
    if name_in.ns.as_ref() != declared {
        let declared_ns = NamespaceId::new_unchecked(bytes_from(declared.to_vec()));
        return Err(ValidationError::NamespaceMismatch(
            keva_types::errors::NamespaceIdDisplay(name_in.ns.clone()),
            keva_types::errors::NamespaceIdDisplay(declared_ns),
        ));
    }
    Ok(name_in.ns.clone())
}

fn check_key_length(key: &[u8]) -> ValidationResult<()> {
    if key.len() > Key::MAX_LEN {
        return Err(ValidationError::KeyTooLong(key.len(), Key::MAX_LEN));
    }
    Ok(())
}

fn check_value_length(value: &[u8]) -> ValidationResult<()> {
    if value.len() > Value::MAX_LEN {
        return Err(ValidationError::ValueTooLong(value.len(), Value::MAX_LEN));
    }
    Ok(())
}

fn check_display_name_length(display_name: &[u8]) -> ValidationResult<()> {
    if display_name.len() > Value::MAX_LEN {
        return Err(ValidationError::DisplayNameTooLong(display_name.len(), Value::MAX_LEN));
    }
    Ok(())
}

/// Scans `tx.vin`'s previous-output scripts for a keva op (spec §4.5): at
/// most one input may carry one.
fn find_name_in(tx: &Transaction, coin_view: &dyn CoinView) -> ValidationResult<Option<NameIn>> {
    let mut found = None;
    let mut count = 0usize;
    for input in &tx.inputs {
        let Some(coin) = coin_view.get_coin(&input.prev_outpoint) else { continue };
        let Some(parsed) = parse_keva_script(&coin.script_pubkey) else { continue };
        count += 1;
        if found.is_none() {
            let (namespace, kind) = match parsed.op {
                KevaOp::Namespace { namespace, .. } => (namespace, NameInKind::Registration),
                KevaOp::Put { namespace, .. } => (namespace, NameInKind::Update),
                KevaOp::Delete { namespace, .. } => (namespace, NameInKind::Delete),
            };
            found = Some(NameIn { ns: NamespaceId::new_unchecked(bytes_from(namespace)), kind });
        }
    }
    if count > 1 {
        return Err(ValidationError::MultipleKevaInputs(count));
    }
    Ok(found)
}

/// Scans `tx.vout`'s scripts for a keva op (spec §4.5): at most one output
/// may carry one.
fn find_name_out(tx: &Transaction) -> ValidationResult<Option<(usize, KevaOp)>> {
    let mut found = None;
    let mut count = 0usize;
    for (index, output) in tx.outputs.iter().enumerate() {
        let Some(parsed) = parse_keva_script(&output.script_pubkey) else { continue };
        count += 1;
        if found.is_none() {
            found = Some((index, parsed.op));
        }
    }
    if count > 1 {
        return Err(ValidationError::MultipleKevaOutputs(count));
    }
    Ok(found)
}
