//! SPL Token operations for Solana.
//!
//! Implements the handful of SPL Token and Associated Token Account
//! instructions the relay needs, plus ATA address derivation, without pulling
//! in the `solana-sdk` or the `spl-token` crates.

use crate::address::{find_program_address, Address};
use crate::error::SolError;
use crate::system::SYSTEM_PROGRAM_ID;
use crate::transaction::{AccountMeta, Instruction};

// ---------------------------------------------------------------------------
// Well-known program IDs
// ---------------------------------------------------------------------------

pub const TOKEN_PROGRAM_ID: Address =
    Address::from_base58_const("TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA");

pub const ASSOCIATED_TOKEN_PROGRAM_ID: Address =
    Address::from_base58_const("ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL");

/// Wrapped SOL mint.
pub const NATIVE_MINT: Address =
    Address::from_base58_const("So11111111111111111111111111111111111111112");

/// Packed size of an SPL token account.
pub const TOKEN_ACCOUNT_LEN: usize = 165;

const TRANSFER_CHECKED: u8 = 12;
const SYNC_NATIVE: u8 = 17;
const CLOSE_ACCOUNT: u8 = 9;

const ATA_CREATE: u8 = 0;
const ATA_CREATE_IDEMPOTENT: u8 = 1;

// ---------------------------------------------------------------------------
// Token program instructions
// ---------------------------------------------------------------------------

/// Build an SPL Token `TransferChecked` instruction.
///
/// # Wire format
///
/// `[12]` + u64 LE amount + u8 decimals = 10 bytes. The token program
/// rejects the instruction if `decimals` differs from the mint's.
pub fn transfer_checked(
    source: &Address,
    mint: &Address,
    destination: &Address,
    authority: &Address,
    amount: u64,
    decimals: u8,
) -> Result<Instruction, SolError> {
    if amount == 0 {
        return Err(SolError::InvalidAmount(
            "SPL transfer amount must be > 0".into(),
        ));
    }

    let mut data = Vec::with_capacity(10);
    data.push(TRANSFER_CHECKED);
    data.extend_from_slice(&amount.to_le_bytes());
    data.push(decimals);

    Ok(Instruction {
        program_id: TOKEN_PROGRAM_ID,
        accounts: vec![
            AccountMeta::writable(*source, false),
            AccountMeta::readonly(*mint, false),
            AccountMeta::writable(*destination, false),
            AccountMeta::readonly(*authority, true),
        ],
        data,
    })
}

/// Sync a wrapped-SOL account's token balance with its lamports.
pub fn sync_native(account: &Address) -> Instruction {
    Instruction {
        program_id: TOKEN_PROGRAM_ID,
        accounts: vec![AccountMeta::writable(*account, false)],
        data: vec![SYNC_NATIVE],
    }
}

/// Close a token account, sending its lamports to `destination`.
pub fn close_account(account: &Address, destination: &Address, owner: &Address) -> Instruction {
    Instruction {
        program_id: TOKEN_PROGRAM_ID,
        accounts: vec![
            AccountMeta::writable(*account, false),
            AccountMeta::writable(*destination, false),
            AccountMeta::readonly(*owner, true),
        ],
        data: vec![CLOSE_ACCOUNT],
    }
}

// ---------------------------------------------------------------------------
// Associated Token Account program
// ---------------------------------------------------------------------------

/// Create the ATA of `wallet` for `mint`, rent funded by `payer`.
///
/// Fails on-chain if the account already exists.
pub fn create_associated_token_account(
    payer: &Address,
    wallet: &Address,
    mint: &Address,
) -> Result<Instruction, SolError> {
    create_ata(payer, wallet, mint, ATA_CREATE)
}

/// Like [`create_associated_token_account`] but a no-op when the account
/// already exists.
pub fn create_associated_token_account_idempotent(
    payer: &Address,
    wallet: &Address,
    mint: &Address,
) -> Result<Instruction, SolError> {
    create_ata(payer, wallet, mint, ATA_CREATE_IDEMPOTENT)
}

fn create_ata(
    payer: &Address,
    wallet: &Address,
    mint: &Address,
    kind: u8,
) -> Result<Instruction, SolError> {
    let ata = derive_associated_token_address(wallet, mint)?;

    Ok(Instruction {
        program_id: ASSOCIATED_TOKEN_PROGRAM_ID,
        accounts: vec![
            AccountMeta::writable(*payer, true),
            AccountMeta::writable(ata, false),
            AccountMeta::readonly(*wallet, false),
            AccountMeta::readonly(*mint, false),
            AccountMeta::readonly(SYSTEM_PROGRAM_ID, false),
            AccountMeta::readonly(TOKEN_PROGRAM_ID, false),
        ],
        data: vec![kind],
    })
}

/// Derive the associated token account address for a wallet + mint pair.
///
/// The ATA is a Program Derived Address (PDA) with seeds:
///   `[wallet_address, token_program_id, mint_address]`
/// derived from the Associated Token Account program.
pub fn derive_associated_token_address(
    wallet: &Address,
    mint: &Address,
) -> Result<Address, SolError> {
    find_program_address(
        &[wallet.as_ref(), TOKEN_PROGRAM_ID.as_ref(), mint.as_ref()],
        &ASSOCIATED_TOKEN_PROGRAM_ID,
    )
    .map(|(address, _bump)| address)
}

// ---------------------------------------------------------------------------
// Account state
// ---------------------------------------------------------------------------

/// The leading fields of a packed SPL token account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenAccount {
    pub mint: Address,
    pub owner: Address,
    pub amount: u64,
}

impl TokenAccount {
    pub fn unpack(data: &[u8]) -> Result<Self, SolError> {
        if data.len() != TOKEN_ACCOUNT_LEN {
            return Err(SolError::SerializationError(format!(
                "token account must be {TOKEN_ACCOUNT_LEN} bytes, got {}",
                data.len()
            )));
        }

        let mut mint = [0u8; 32];
        let mut owner = [0u8; 32];
        let mut amount = [0u8; 8];
        mint.copy_from_slice(&data[0..32]);
        owner.copy_from_slice(&data[32..64]);
        amount.copy_from_slice(&data[64..72]);

        Ok(Self {
            mint: Address::new(mint),
            owner: Address::new(owner),
            amount: u64::from_le_bytes(amount),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(b: u8) -> Address {
        Address::new([b; 32])
    }

    // -- Constant verification ----------------------------------------------

    #[test]
    fn program_ids_render_back() {
        assert_eq!(
            TOKEN_PROGRAM_ID.to_string(),
            "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA"
        );
        assert_eq!(
            ASSOCIATED_TOKEN_PROGRAM_ID.to_string(),
            "ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL"
        );
        assert_eq!(
            NATIVE_MINT.to_string(),
            "So11111111111111111111111111111111111111112"
        );
    }

    #[test]
    fn token_program_id_bytes() {
        assert_eq!(&TOKEN_PROGRAM_ID.as_bytes()[..4], &[0x06, 0xdd, 0xf6, 0xe1]);
    }

    // -- TransferChecked ----------------------------------------------------

    #[test]
    fn transfer_checked_encoding() {
        let ix = transfer_checked(&addr(1), &addr(2), &addr(3), &addr(4), 500_000, 6).unwrap();

        assert_eq!(ix.program_id, TOKEN_PROGRAM_ID);
        assert_eq!(ix.data.len(), 10);
        assert_eq!(ix.data[0], 12);
        assert_eq!(u64::from_le_bytes(ix.data[1..9].try_into().unwrap()), 500_000);
        assert_eq!(ix.data[9], 6);
    }

    #[test]
    fn transfer_checked_account_roles() {
        let ix = transfer_checked(&addr(1), &addr(2), &addr(3), &addr(4), 1, 9).unwrap();

        let roles: Vec<(Address, bool, bool)> = ix
            .accounts
            .iter()
            .map(|m| (m.pubkey, m.is_signer, m.is_writable))
            .collect();
        assert_eq!(
            roles,
            vec![
                (addr(1), false, true),
                (addr(2), false, false),
                (addr(3), false, true),
                (addr(4), true, false),
            ]
        );
    }

    #[test]
    fn transfer_checked_zero_amount_fails() {
        let err = transfer_checked(&addr(1), &addr(2), &addr(3), &addr(4), 0, 6).unwrap_err();
        assert!(matches!(err, SolError::InvalidAmount(_)));
    }

    #[test]
    fn sync_native_and_close_account() {
        let sync = sync_native(&addr(5));
        assert_eq!(sync.data, vec![17]);
        assert!(sync.accounts[0].is_writable);

        let close = close_account(&addr(5), &addr(6), &addr(7));
        assert_eq!(close.data, vec![9]);
        assert!(close.accounts[2].is_signer);
    }

    // -- ATA ----------------------------------------------------------------

    #[test]
    fn create_ata_layout() {
        let payer = addr(0x10);
        let wallet = addr(0x20);
        let mint = addr(0x30);
        let ix = create_associated_token_account(&payer, &wallet, &mint).unwrap();
        let ata = derive_associated_token_address(&wallet, &mint).unwrap();

        assert_eq!(ix.program_id, ASSOCIATED_TOKEN_PROGRAM_ID);
        assert_eq!(ix.data, vec![0]);
        let keys: Vec<Address> = ix.accounts.iter().map(|m| m.pubkey).collect();
        assert_eq!(
            keys,
            vec![payer, ata, wallet, mint, SYSTEM_PROGRAM_ID, TOKEN_PROGRAM_ID]
        );
        assert!(ix.accounts[0].is_signer);
        assert!(ix.accounts[1].is_writable && !ix.accounts[1].is_signer);
    }

    #[test]
    fn create_ata_idempotent_discriminant() {
        let ix = create_associated_token_account_idempotent(&addr(1), &addr(2), &addr(3)).unwrap();
        assert_eq!(ix.data, vec![1]);
    }

    #[test]
    fn ata_is_off_curve_and_deterministic() {
        let a = derive_associated_token_address(&addr(0xAA), &addr(0xBB)).unwrap();
        let b = derive_associated_token_address(&addr(0xAA), &addr(0xBB)).unwrap();
        assert_eq!(a, b);
        assert!(!a.is_on_curve());
    }

    #[test]
    fn different_wallets_or_mints_give_different_atas() {
        let base = derive_associated_token_address(&addr(1), &addr(0xFF)).unwrap();
        assert_ne!(base, derive_associated_token_address(&addr(2), &addr(0xFF)).unwrap());
        assert_ne!(base, derive_associated_token_address(&addr(1), &addr(0xFE)).unwrap());
    }

    // -- Account state ------------------------------------------------------

    #[test]
    fn token_account_unpack() {
        let mut data = vec![0u8; TOKEN_ACCOUNT_LEN];
        data[0..32].copy_from_slice(&[1; 32]);
        data[32..64].copy_from_slice(&[2; 32]);
        data[64..72].copy_from_slice(&42u64.to_le_bytes());

        let account = TokenAccount::unpack(&data).unwrap();
        assert_eq!(account.mint, addr(1));
        assert_eq!(account.owner, addr(2));
        assert_eq!(account.amount, 42);
    }

    #[test]
    fn token_account_wrong_size() {
        assert!(TokenAccount::unpack(&[0u8; 100]).is_err());
    }
}
