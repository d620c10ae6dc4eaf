//! Manual Solana transaction wire format and signing.
//!
//! We build Solana transactions entirely by hand; there is no `solana-sdk` dependency.
//! The wire format is a compact binary layout documented here:
//!
//! ```text
//! Transaction:
//!   num_signatures          compact-u16
//!   signatures              64 bytes * num_signatures
//!   message:
//!     num_required_sigs     u8
//!     num_readonly_signed   u8
//!     num_readonly_unsigned u8
//!     num_accounts          compact-u16
//!     account_keys          32 bytes * num_accounts
//!     recent_blockhash      32 bytes
//!     num_instructions      compact-u16
//!     instructions[]        (see below)
//!
//! Instruction:
//!   program_id_index        u8
//!   num_accounts            compact-u16
//!   account_indices         u8 * num_accounts
//!   data_len                compact-u16
//!   data                    u8 * data_len
//! ```
//!
//! An unsigned transaction carries zero-filled signature slots so that its
//! wire form is the exact byte layout a custodian later fills in.

use serde::Serialize;

use crate::address::{Address, Blockhash};
use crate::error::SolError;
use crate::keypair::Keypair;

/// Account indices are single bytes on the wire.
const MAX_ACCOUNT_KEYS: usize = 256;

const SIGNATURE_LEN: usize = 64;

/// High bit of the first message byte marks a versioned (v0+) message.
const VERSION_PREFIX_MASK: u8 = 0x80;

// ---------------------------------------------------------------------------
// Compact-u16 encoding
// ---------------------------------------------------------------------------

/// Encode a `u16` value in Solana's compact-u16 format.
///
/// - Values 0..0x7f       -> 1 byte
/// - Values 0x80..0x3fff  -> 2 bytes
/// - Values 0x4000..      -> 3 bytes
pub fn encode_compact_u16(value: u16) -> Vec<u8> {
    let mut val = value as u32;
    let mut out = Vec::with_capacity(3);

    loop {
        let mut byte = (val & 0x7f) as u8;
        val >>= 7;
        if val > 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if val == 0 {
            break;
        }
    }

    out
}

/// Decode a compact-u16 value from a byte slice.
///
/// Returns `(value, bytes_consumed)`. Truncated input, values above
/// `u16::MAX` and non-canonical (zero-padded) encodings are rejected, so a
/// parsed message always re-serializes to the bytes it came from.
pub fn decode_compact_u16(data: &[u8]) -> Result<(u16, usize), SolError> {
    let mut value: u32 = 0;

    for (i, &byte) in data.iter().take(3).enumerate() {
        value |= ((byte & 0x7f) as u32) << (7 * i);

        if byte & 0x80 == 0 {
            if i > 0 && byte == 0 {
                return Err(SolError::SerializationError(
                    "non-canonical compact-u16 encoding".into(),
                ));
            }
            if value > u16::MAX as u32 {
                return Err(SolError::SerializationError(
                    "compact-u16 value overflow".into(),
                ));
            }
            return Ok((value as u16, i + 1));
        }
    }

    if data.len() >= 3 {
        return Err(SolError::SerializationError(
            "compact-u16 value overflow".into(),
        ));
    }
    Err(SolError::SerializationError(
        "unexpected end of data while decoding compact-u16".into(),
    ))
}

fn compact_len(len: usize, what: &str) -> Result<Vec<u8>, SolError> {
    let len = u16::try_from(len)
        .map_err(|_| SolError::TransactionBuildError(format!("too many {what}: {len}")))?;
    Ok(encode_compact_u16(len))
}

// ---------------------------------------------------------------------------
// Data structures
// ---------------------------------------------------------------------------

/// A single account reference in an instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountMeta {
    pub pubkey: Address,
    pub is_signer: bool,
    pub is_writable: bool,
}

impl AccountMeta {
    pub fn writable(pubkey: Address, is_signer: bool) -> Self {
        Self {
            pubkey,
            is_signer,
            is_writable: true,
        }
    }

    pub fn readonly(pubkey: Address, is_signer: bool) -> Self {
        Self {
            pubkey,
            is_signer,
            is_writable: false,
        }
    }
}

/// An instruction before it is compiled into a message.
///
/// Account order is defined by the target program and is never rearranged
/// here; a wrong order is only detected by the ledger at execution time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Instruction {
    pub program_id: Address,
    pub accounts: Vec<AccountMeta>,
    pub data: Vec<u8>,
}

/// A compiled instruction where account references are replaced by u8 indices
/// into the message's `account_keys` array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledInstruction {
    /// Index into `account_keys` for the program to invoke.
    pub program_id_index: u8,
    /// Indices into `account_keys` for each account the instruction reads/writes.
    pub account_indices: Vec<u8>,
    /// Opaque instruction data.
    pub data: Vec<u8>,
}

/// A legacy transaction message: the exact bytes every signer signs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Number of required signatures (first N accounts are signers).
    pub num_required_signatures: u8,
    /// How many of the signing accounts are read-only.
    pub num_readonly_signed: u8,
    /// How many of the non-signing accounts are read-only.
    pub num_readonly_unsigned: u8,

    /// All account keys referenced by this message, in canonical order:
    ///   1. writable signers (fee payer first)
    ///   2. read-only signers
    ///   3. writable non-signers
    ///   4. read-only non-signers
    pub account_keys: Vec<Address>,

    pub recent_blockhash: Blockhash,

    pub instructions: Vec<CompiledInstruction>,
}

// ---------------------------------------------------------------------------
// Message compilation
// ---------------------------------------------------------------------------

/// Compile instructions, a fee payer and a recent blockhash into a message.
///
/// Instruction order is preserved exactly. Repeated addresses collapse into
/// a single account key whose permissions are the union of every use. The
/// result depends only on the inputs, so identical inputs always serialize
/// to identical bytes.
pub fn compile_message(
    instructions: &[Instruction],
    fee_payer: &Address,
    recent_blockhash: &Blockhash,
) -> Result<Message, SolError> {
    struct AccountEntry {
        pubkey: Address,
        is_signer: bool,
        is_writable: bool,
    }

    let mut entries: Vec<AccountEntry> = Vec::new();

    let mut upsert = |pubkey: Address, signer: bool, writable: bool| {
        if let Some(entry) = entries.iter_mut().find(|e| e.pubkey == pubkey) {
            entry.is_signer |= signer;
            entry.is_writable |= writable;
        } else {
            entries.push(AccountEntry {
                pubkey,
                is_signer: signer,
                is_writable: writable,
            });
        }
    };

    // Fee payer is always signer + writable, and inserted first so the
    // stable sort below keeps it at index 0.
    upsert(*fee_payer, true, true);

    for ix in instructions {
        for meta in &ix.accounts {
            upsert(meta.pubkey, meta.is_signer, meta.is_writable);
        }
        upsert(ix.program_id, false, false);
    }

    if entries.len() > MAX_ACCOUNT_KEYS {
        return Err(SolError::TransactionBuildError(format!(
            "{} distinct accounts exceed the {MAX_ACCOUNT_KEYS} addressable by a message",
            entries.len()
        )));
    }

    // `sort_by_key` is stable: within a class, first appearance wins.
    entries.sort_by_key(|e| match (e.is_signer, e.is_writable) {
        (true, true) => 0u8,
        (true, false) => 1,
        (false, true) => 2,
        (false, false) => 3,
    });

    let count = |pred: fn(&AccountEntry) -> bool| entries.iter().filter(|e| pred(e)).count() as u8;
    let num_required_signatures = count(|e| e.is_signer);
    let num_readonly_signed = count(|e| e.is_signer && !e.is_writable);
    let num_readonly_unsigned = count(|e| !e.is_signer && !e.is_writable);

    let account_keys: Vec<Address> = entries.iter().map(|e| e.pubkey).collect();
    let index_of = |key: &Address| -> Result<u8, SolError> {
        account_keys
            .iter()
            .position(|k| k == key)
            .map(|i| i as u8)
            .ok_or_else(|| SolError::TransactionBuildError(format!("{key} not in account keys")))
    };

    let mut compiled = Vec::with_capacity(instructions.len());
    for ix in instructions {
        let account_indices = ix
            .accounts
            .iter()
            .map(|meta| index_of(&meta.pubkey))
            .collect::<Result<Vec<u8>, _>>()?;

        compiled.push(CompiledInstruction {
            program_id_index: index_of(&ix.program_id)?,
            account_indices,
            data: ix.data.clone(),
        });
    }

    Ok(Message {
        num_required_signatures,
        num_readonly_signed,
        num_readonly_unsigned,
        account_keys,
        recent_blockhash: *recent_blockhash,
        instructions: compiled,
    })
}

impl Message {
    pub fn fee_payer(&self) -> Option<&Address> {
        self.account_keys.first()
    }

    /// The first `num_required_signatures` keys, in signature-slot order.
    pub fn signer_keys(&self) -> &[Address] {
        let n = (self.num_required_signatures as usize).min(self.account_keys.len());
        &self.account_keys[..n]
    }

    pub fn is_signer(&self, index: usize) -> bool {
        index < self.num_required_signatures as usize
    }

    pub fn is_writable(&self, index: usize) -> bool {
        let num_signed = self.num_required_signatures as usize;
        if index < num_signed {
            index < num_signed - self.num_readonly_signed as usize
        } else {
            index < self.account_keys.len() - self.num_readonly_unsigned as usize
        }
    }

    /// Serialize the message (the bytes that get signed).
    pub fn serialize(&self) -> Result<Vec<u8>, SolError> {
        let mut buf = Vec::with_capacity(3 + 1 + 32 * self.account_keys.len() + 32 + 64);

        // Header: 3 bytes.
        buf.push(self.num_required_signatures);
        buf.push(self.num_readonly_signed);
        buf.push(self.num_readonly_unsigned);

        buf.extend_from_slice(&compact_len(self.account_keys.len(), "account keys")?);
        for key in &self.account_keys {
            buf.extend_from_slice(key.as_bytes());
        }

        buf.extend_from_slice(self.recent_blockhash.as_bytes());

        buf.extend_from_slice(&compact_len(self.instructions.len(), "instructions")?);
        for ix in &self.instructions {
            buf.push(ix.program_id_index);

            buf.extend_from_slice(&compact_len(ix.account_indices.len(), "instruction accounts")?);
            buf.extend_from_slice(&ix.account_indices);

            buf.extend_from_slice(&compact_len(ix.data.len(), "instruction data bytes")?);
            buf.extend_from_slice(&ix.data);
        }

        Ok(buf)
    }

    /// Parse a legacy message, consuming the whole slice.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, SolError> {
        let mut reader = Reader::new(bytes);
        let message = Self::read(&mut reader)?;
        reader.finish()?;
        Ok(message)
    }

    fn read(reader: &mut Reader<'_>) -> Result<Self, SolError> {
        let num_required_signatures = reader.u8()?;
        if num_required_signatures & VERSION_PREFIX_MASK != 0 {
            return Err(SolError::SerializationError(
                "versioned messages are not supported".into(),
            ));
        }
        let num_readonly_signed = reader.u8()?;
        let num_readonly_unsigned = reader.u8()?;

        let num_keys = reader.compact_u16()? as usize;
        let mut account_keys = Vec::with_capacity(num_keys);
        for _ in 0..num_keys {
            account_keys.push(Address::new(reader.array::<32>()?));
        }

        if num_required_signatures as usize > num_keys
            || num_readonly_signed > num_required_signatures
            || num_readonly_unsigned as usize > num_keys - num_required_signatures as usize
        {
            return Err(SolError::SerializationError(
                "message header is inconsistent with account keys".into(),
            ));
        }

        let recent_blockhash = Address::new(reader.array::<32>()?);

        let num_instructions = reader.compact_u16()? as usize;
        let mut instructions = Vec::with_capacity(num_instructions.min(64));
        for _ in 0..num_instructions {
            let program_id_index = reader.u8()?;
            let n = reader.compact_u16()? as usize;
            let account_indices = reader.bytes(n)?.to_vec();
            let len = reader.compact_u16()? as usize;
            let data = reader.bytes(len)?.to_vec();

            let out_of_range = std::iter::once(&program_id_index)
                .chain(account_indices.iter())
                .any(|&i| i as usize >= num_keys);
            if out_of_range {
                return Err(SolError::SerializationError(
                    "instruction references an account index out of range".into(),
                ));
            }

            instructions.push(CompiledInstruction {
                program_id_index,
                account_indices,
                data,
            });
        }

        Ok(Self {
            num_required_signatures,
            num_readonly_signed,
            num_readonly_unsigned,
            account_keys,
            recent_blockhash,
            instructions,
        })
    }

    /// Rebuild the instruction list with signer/writable flags taken from
    /// the header, as a ledger node would see them.
    pub fn decompile(&self) -> Vec<Instruction> {
        self.instructions
            .iter()
            .map(|ix| Instruction {
                program_id: self.account_keys[ix.program_id_index as usize],
                accounts: ix
                    .account_indices
                    .iter()
                    .map(|&i| AccountMeta {
                        pubkey: self.account_keys[i as usize],
                        is_signer: self.is_signer(i as usize),
                        is_writable: self.is_writable(i as usize),
                    })
                    .collect(),
                data: ix.data.clone(),
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Transactions
// ---------------------------------------------------------------------------

/// A compiled message awaiting signatures. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedTransaction {
    message: Message,
}

impl UnsignedTransaction {
    /// Compile `instructions` into a transaction paid for by `fee_payer`.
    pub fn new(
        instructions: &[Instruction],
        fee_payer: &Address,
        recent_blockhash: &Blockhash,
    ) -> Result<Self, SolError> {
        Ok(Self {
            message: compile_message(instructions, fee_payer, recent_blockhash)?,
        })
    }

    pub fn message(&self) -> &Message {
        &self.message
    }

    /// Wire bytes with zero-filled signature slots.
    pub fn to_wire(&self) -> Result<Vec<u8>, SolError> {
        let slots = vec![[0u8; SIGNATURE_LEN]; self.message.num_required_signatures as usize];
        write_wire(&slots, &self.message)
    }

    pub fn to_base58(&self) -> Result<String, SolError> {
        Ok(bs58::encode(self.to_wire()?).into_string())
    }

    /// Parse wire bytes, ignoring whatever the signature slots contain.
    pub fn from_wire(bytes: &[u8]) -> Result<Self, SolError> {
        let (_, message) = read_wire(bytes)?;
        Ok(Self { message })
    }

    pub fn from_base58(text: &str) -> Result<Self, SolError> {
        Self::from_wire(&decode_base58_wire(text)?)
    }
}

/// A message plus one signature slot per required signer.
///
/// Slots are keyed by position: slot `i` belongs to `account_keys[i]`.
/// Unfilled slots stay zero until their signer adds a signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    signatures: Vec<[u8; SIGNATURE_LEN]>,
    message: Message,
}

impl SignedTransaction {
    pub fn message(&self) -> &Message {
        &self.message
    }

    pub fn signatures(&self) -> &[[u8; SIGNATURE_LEN]] {
        &self.signatures
    }

    /// The signature stored for `signer`, if that slot has been filled.
    pub fn signature_for(&self, signer: &Address) -> Option<&[u8; SIGNATURE_LEN]> {
        let index = self.message.signer_keys().iter().position(|k| k == signer)?;
        self.signatures
            .get(index)
            .filter(|sig| sig.iter().any(|&b| b != 0))
    }

    /// Whether every signature slot holds a non-zero signature.
    pub fn is_fully_signed(&self) -> bool {
        self.signatures.iter().all(|sig| sig.iter().any(|&b| b != 0))
    }

    pub fn to_wire(&self) -> Result<Vec<u8>, SolError> {
        write_wire(&self.signatures, &self.message)
    }

    pub fn to_base58(&self) -> Result<String, SolError> {
        Ok(bs58::encode(self.to_wire()?).into_string())
    }

    pub fn from_wire(bytes: &[u8]) -> Result<Self, SolError> {
        let (signatures, message) = read_wire(bytes)?;
        Ok(Self {
            signatures,
            message,
        })
    }
}

fn write_wire(signatures: &[[u8; SIGNATURE_LEN]], message: &Message) -> Result<Vec<u8>, SolError> {
    let message_bytes = message.serialize()?;
    let mut wire = Vec::with_capacity(3 + SIGNATURE_LEN * signatures.len() + message_bytes.len());

    wire.extend_from_slice(&compact_len(signatures.len(), "signatures")?);
    for sig in signatures {
        wire.extend_from_slice(sig);
    }
    wire.extend_from_slice(&message_bytes);

    Ok(wire)
}

fn read_wire(bytes: &[u8]) -> Result<(Vec<[u8; SIGNATURE_LEN]>, Message), SolError> {
    let mut reader = Reader::new(bytes);

    let num_sigs = reader.compact_u16()? as usize;
    let mut signatures = Vec::with_capacity(num_sigs.min(16));
    for _ in 0..num_sigs {
        signatures.push(reader.array::<SIGNATURE_LEN>()?);
    }

    let message = Message::read(&mut reader)?;
    reader.finish()?;

    if num_sigs != message.num_required_signatures as usize {
        return Err(SolError::SerializationError(format!(
            "transaction has {num_sigs} signature slots but its message requires {}",
            message.num_required_signatures
        )));
    }

    Ok((signatures, message))
}

fn decode_base58_wire(text: &str) -> Result<Vec<u8>, SolError> {
    bs58::decode(text.trim())
        .into_vec()
        .map_err(|e| SolError::SerializationError(format!("base58 decode failed: {e}")))
}

// ---------------------------------------------------------------------------
// Signing
// ---------------------------------------------------------------------------

/// Sign a serialized transaction with `keypair`.
///
/// The transaction is re-parsed, its embedded blockhash must equal
/// `blockhash`, and the keypair's address must occupy one of the required
/// signer slots. The signature is written into that slot; every other slot
/// is carried over untouched so co-signers can sign in any order.
pub fn sign_transaction(
    wire: &[u8],
    keypair: &Keypair,
    blockhash: &Blockhash,
) -> Result<SignedTransaction, SolError> {
    let (mut signatures, message) = read_wire(wire)?;

    if message.recent_blockhash != *blockhash {
        return Err(SolError::BlockhashMismatch {
            embedded: message.recent_blockhash.to_base58(),
            supplied: blockhash.to_base58(),
        });
    }

    let signer = keypair.address();
    let slot = message
        .signer_keys()
        .iter()
        .position(|k| *k == signer)
        .ok_or_else(|| SolError::NotASigner(signer.to_base58()))?;

    let message_bytes = message.serialize()?;
    signatures[slot] = keypair.sign(&message_bytes);

    Ok(SignedTransaction {
        signatures,
        message,
    })
}

/// Base58 convenience wrapper around [`sign_transaction`].
pub fn sign_base58_transaction(
    transaction: &str,
    keypair: &Keypair,
    blockhash: &Blockhash,
) -> Result<SignedTransaction, SolError> {
    sign_transaction(&decode_base58_wire(transaction)?, keypair, blockhash)
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Bounds-checked cursor over wire bytes.
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn bytes(&mut self, n: usize) -> Result<&'a [u8], SolError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| {
                SolError::SerializationError(format!(
                    "unexpected end of data: wanted {n} bytes at offset {}",
                    self.pos
                ))
            })?;
        let out = &self.data[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8, SolError> {
        Ok(self.bytes(1)?[0])
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], SolError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.bytes(N)?);
        Ok(out)
    }

    fn compact_u16(&mut self) -> Result<u16, SolError> {
        let (value, consumed) = decode_compact_u16(&self.data[self.pos..])?;
        self.pos += consumed;
        Ok(value)
    }

    fn finish(&self) -> Result<(), SolError> {
        if self.pos != self.data.len() {
            return Err(SolError::SerializationError(format!(
                "{} trailing bytes after transaction",
                self.data.len() - self.pos
            )));
        }
        Ok(())
    }
}
