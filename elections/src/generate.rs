//! Election and vote construction.

use lattice_conditions::OwnerSpec;
use lattice_store::Validator;
use lattice_transactions::{Operation, Recipient, Transaction};
use lattice_types::{Amount, PublicKey, TransactionId, ValidationError};
use serde_json::{json, Value};

/// The key election votes are paid to: the election id reinterpreted as a
/// public key, so no one holds the matching private key and tokens sent
/// there are burned into the tally.
pub fn election_public_key(election_id: &TransactionId) -> PublicKey {
    PublicKey(*election_id.as_bytes())
}

/// Build an unsigned election proposal.
///
/// The proposal is CREATE-shaped with a single input owned by `initiator`
/// and one output per current validator carrying its voting power. A random
/// seed is folded into the asset data so two otherwise identical proposals
/// get distinct ids.
pub fn generate_election(
    operation: Operation,
    initiator: PublicKey,
    validators: &[Validator],
    data: Option<Value>,
) -> Result<Transaction, ValidationError> {
    if !operation.is_election() {
        return Err(ValidationError::Schema {
            reason: format!("`{operation}` is not an election operation"),
        });
    }
    if validators.is_empty() {
        return Err(ValidationError::Schema {
            reason: "cannot open an election with an empty validator set".into(),
        });
    }
    let recipients = validators
        .iter()
        .map(|validator| {
            Ok((
                vec![OwnerSpec::Key(validator.public_key)],
                Amount::new(validator.voting_power)?,
            ))
        })
        .collect::<Result<Vec<Recipient>, ValidationError>>()?;

    let mut asset_data = match data {
        None => json!({}),
        Some(Value::Object(map)) => Value::Object(map),
        Some(_) => {
            return Err(ValidationError::Schema {
                reason: "election data must be a JSON object".into(),
            })
        }
    };
    if let Value::Object(map) = &mut asset_data {
        map.insert("seed".into(), json!(hex::encode(rand::random::<[u8; 16]>())));
    }

    Transaction::create_as(
        operation,
        &[initiator],
        &recipients,
        lattice_transactions::Asset::definition(Some(asset_data)),
        None,
    )
}

/// Build an unsigned vote casting all of `voter`'s tokens on `election`.
pub fn generate_vote(
    election: &Transaction,
    voter: &PublicKey,
) -> Result<Transaction, ValidationError> {
    let election_id = election.id.ok_or_else(|| ValidationError::Schema {
        reason: "cannot vote on an unsigned election".into(),
    })?;
    let index = election
        .outputs
        .iter()
        .position(|output| output.public_keys == [*voter])
        .ok_or(ValidationError::InvalidProposer)?;
    let power = election.outputs[index].amount;
    Transaction::transfer_as(
        Operation::ValidatorElectionVote,
        vec![election.to_input(index)?],
        &[(
            vec![OwnerSpec::Key(election_public_key(&election_id))],
            power,
        )],
        election_id,
        None,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use lattice_crypto::keypair_from_seed;

    fn validators() -> Vec<Validator> {
        (1u8..=3)
            .map(|n| Validator {
                public_key: keypair_from_seed(&[n; 32]).public,
                voting_power: n as u64 * 10,
            })
            .collect()
    }

    #[test]
    fn election_outputs_mirror_the_validator_set() {
        let initiator = keypair_from_seed(&[1u8; 32]);
        let election = generate_election(
            Operation::ValidatorElection,
            initiator.public,
            &validators(),
            None,
        )
        .unwrap();
        assert_eq!(election.outputs.len(), 3);
        assert_eq!(election.outputs[2].amount.value(), 30);
        assert_eq!(election.inputs.len(), 1);
        assert_eq!(election.inputs[0].owners_before, vec![initiator.public]);
    }

    #[test]
    fn seed_makes_identical_proposals_distinct() {
        let initiator = keypair_from_seed(&[1u8; 32]);
        let a = generate_election(
            Operation::ChainMigrationElection,
            initiator.public,
            &validators(),
            None,
        )
        .unwrap();
        let b = generate_election(
            Operation::ChainMigrationElection,
            initiator.public,
            &validators(),
            None,
        )
        .unwrap();
        assert_ne!(a.compute_id(), b.compute_id());
    }

    #[test]
    fn non_election_operation_rejected() {
        let initiator = keypair_from_seed(&[1u8; 32]);
        assert!(generate_election(
            Operation::Create,
            initiator.public,
            &validators(),
            None
        )
        .is_err());
    }

    #[test]
    fn vote_pays_the_election_key() {
        let initiator = keypair_from_seed(&[1u8; 32]);
        let mut election = generate_election(
            Operation::ValidatorElection,
            initiator.public,
            &validators(),
            Some(serde_json::json!({
                "public_key": keypair_from_seed(&[9u8; 32]).public.to_base58(),
                "power": 5,
                "node_id": "node-9",
            })),
        )
        .unwrap();
        election
            .sign(std::slice::from_ref(&initiator.private))
            .unwrap();

        let voter = keypair_from_seed(&[2u8; 32]);
        let vote = generate_vote(&election, &voter.public).unwrap();
        assert_eq!(vote.operation, Operation::ValidatorElectionVote);
        assert_eq!(vote.outputs.len(), 1);
        assert_eq!(vote.outputs[0].amount.value(), 20);
        assert_eq!(
            vote.outputs[0].public_keys,
            vec![election_public_key(&election.id.unwrap())]
        );
    }

    #[test]
    fn outsider_cannot_vote() {
        let initiator = keypair_from_seed(&[1u8; 32]);
        let mut election = generate_election(
            Operation::ValidatorElection,
            initiator.public,
            &validators(),
            None,
        )
        .unwrap();
        election
            .sign(std::slice::from_ref(&initiator.private))
            .unwrap();
        let outsider = keypair_from_seed(&[9u8; 32]);
        assert!(matches!(
            generate_vote(&election, &outsider.public),
            Err(ValidationError::InvalidProposer)
        ));
    }
}
