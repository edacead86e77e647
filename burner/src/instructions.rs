use borsh::{BorshDeserialize, BorshSerialize};
use cnft_client::constants::{ACCOUNT_COMPRESSION_PROGRAM_ID, BUBBLEGUM_PROGRAM_ID, NOOP_PROGRAM_ID};
use solana_sdk::{
    compute_budget::ComputeBudgetInstruction,
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    system_program,
};

use crate::{config::TransactionConfig, errors::BurnError, proof::BurnArgs, Result};

/// First 8 bytes of `sha256("global:burn")`.
pub const BURN_DISCRIMINATOR: [u8; 8] = [116, 110, 29, 56, 107, 219, 42, 93];

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct BurnInstructionData {
    pub root: [u8; 32],
    pub data_hash: [u8; 32],
    pub creator_hash: [u8; 32],
    pub nonce: u64,
    pub index: u32,
}

pub fn get_tree_config_pda(merkle_tree: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(&[merkle_tree.as_ref()], &BUBBLEGUM_PROGRAM_ID).0
}

/// Builds the Bubblegum `burn` instruction for `signer`, which must be the
/// leaf owner or its active delegate.
pub fn create_burn_instruction(signer: &Pubkey, args: &BurnArgs) -> Result<Instruction> {
    let ownership = &args.ownership;
    if !ownership.can_sign(signer) {
        return Err(BurnError::UnauthorizedSigner {
            signer: *signer,
            owner: ownership.owner,
            asset: args.asset_id,
        });
    }
    let leaf_owner = ownership.owner;
    let leaf_delegate = ownership.leaf_delegate();

    let mut accounts = vec![
        AccountMeta::new_readonly(get_tree_config_pda(&args.tree), false),
        AccountMeta::new_readonly(leaf_owner, leaf_owner == *signer),
        AccountMeta::new_readonly(leaf_delegate, leaf_delegate == *signer && leaf_owner != *signer),
        AccountMeta::new(args.tree, false),
        AccountMeta::new_readonly(NOOP_PROGRAM_ID, false),
        AccountMeta::new_readonly(ACCOUNT_COMPRESSION_PROGRAM_ID, false),
        AccountMeta::new_readonly(system_program::ID, false),
    ];
    accounts.extend(
        args.proof
            .iter()
            .map(|node| AccountMeta::new_readonly(*node, false)),
    );

    let data = BurnInstructionData {
        root: args.root,
        data_hash: args.data_hash,
        creator_hash: args.creator_hash,
        nonce: args.nonce,
        index: args.index,
    };
    let mut instruction_data = BURN_DISCRIMINATOR.to_vec();
    data.serialize(&mut instruction_data)
        .map_err(BurnError::general)?;

    Ok(Instruction {
        program_id: BUBBLEGUM_PROGRAM_ID,
        accounts,
        data: instruction_data,
    })
}

/// Price first, then limit, then the burn.
pub fn with_compute_budget(config: &TransactionConfig, instruction: Instruction) -> Vec<Instruction> {
    vec![
        ComputeBudgetInstruction::set_compute_unit_price(config.compute_unit_price),
        ComputeBudgetInstruction::set_compute_unit_limit(config.compute_unit_limit),
        instruction,
    ]
}
