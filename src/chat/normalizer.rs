// src/chat/normalizer.rs
//
// Tool payloads carry no type tag. The variant is picked by which fields are
// present, checked in this exact order:
//
//   1. `error` (anything but null/false)   -> Error
//   2. `status` and `currentPhase`         -> MintStatus
//   3. `topHolders`                        -> TopHolders
//   4. `totalCount`                        -> OwnerSummary
//   5. `totalNfts`                         -> CollectionSummary
//   6. otherwise                           -> PlainMessage

use serde_json::Value;

use crate::chat::payload::{ChatPayload, HolderEntry, OwnedNft, Trait};
use crate::chat::router::CollectionInfo;
use crate::utils::{short_address, value_as_id, value_as_u64};

/// Whatever the router learned around the primary call.
#[derive(Debug, Clone, Default)]
pub struct NormalizeContext {
    pub collection: CollectionInfo,
    /// Unique holder count from the analytics lookup, if it succeeded.
    pub holders: Option<u64>,
    pub collection_name: Option<String>,
    pub collection_symbol: Option<String>,
    /// Owner the lookup was made for.
    pub owner: Option<String>,
    /// The token shown was picked at random rather than asked for.
    pub random_token: bool,
}

pub fn normalize(payload: &Value, ctx: &NormalizeContext) -> ChatPayload {
    if has_error(payload) {
        return ChatPayload::error(error_message(payload));
    }
    if payload.get("status").is_some() && payload.get("currentPhase").is_some() {
        return mint_status(payload, ctx);
    }
    if payload.get("topHolders").is_some() {
        return top_holders(payload, ctx);
    }
    if payload.get("totalCount").is_some() {
        return owner_summary(payload, ctx);
    }
    if payload.get("totalNfts").is_some() {
        return collection_summary(payload, ctx);
    }
    match payload.get("message").and_then(Value::as_str) {
        Some(message) => ChatPayload::plain(message),
        None => ChatPayload::plain("Done."),
    }
}

pub fn has_error(payload: &Value) -> bool {
    !matches!(payload.get("error"), None | Some(Value::Null) | Some(Value::Bool(false)))
}

fn error_message(payload: &Value) -> String {
    // `{error: true, message}` from the tools, `{error: "..."}` from older callers
    payload
        .get("message")
        .and_then(Value::as_str)
        .or_else(|| payload.get("error").and_then(Value::as_str))
        .unwrap_or("Something went wrong while talking to the collection service. Please try again.")
        .to_string()
}

fn image_url(value: &Value) -> Option<String> {
    ["nftImageUrl", "imageUrl"]
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
        .filter(|url| !url.is_empty())
        .map(str::to_string)
}

fn collection_summary(payload: &Value, ctx: &NormalizeContext) -> ChatPayload {
    let total_supply = value_as_u64(payload.get("totalNfts")).unwrap_or(0);
    let holders = value_as_u64(payload.get("holders"))
        .or(ctx.holders)
        .unwrap_or(0);
    let token_id = value_as_id(payload.get("tokenId"));
    let contract_address = payload
        .get("contractAddress")
        .and_then(Value::as_str)
        .unwrap_or(&ctx.collection.contract_address)
        .to_string();
    let traits = payload
        .get("traits")
        .filter(|t| t.is_array())
        .map(|t| Trait::list_from(Some(t)));

    let name = ctx
        .collection_name
        .as_deref()
        .unwrap_or("The Medalists");
    let mut text = match &ctx.collection_symbol {
        Some(symbol) => format!("Collection stats for {} ({}) at {}.", name, symbol, short_address(&contract_address)),
        None => format!("Collection stats for {} at {}.", name, short_address(&contract_address)),
    };
    text.push_str(&format!(" Total NFTs: {}, Unique Holders: {}.", total_supply, holders));

    if let Some(id) = &token_id {
        let subject = if ctx.random_token { "Random pick" } else { "Details for" };
        text.push_str(&format!(" {} Medalist #{}", subject, id));
        match traits.as_deref() {
            Some(list) if !list.is_empty() => {
                let rendered: Vec<String> = list
                    .iter()
                    .map(|t| format!("{}: {}", t.trait_type, t.value))
                    .collect();
                text.push_str(&format!(" ({}).", rendered.join(", ")));
            }
            _ => text.push('.'),
        }
    }

    ChatPayload::CollectionSummary {
        total_supply,
        holders,
        network: ctx.collection.network.clone(),
        chain_id: ctx.collection.chain_id,
        contract_address,
        image_url: token_id.as_ref().and_then(|_| image_url(payload)),
        token_id,
        traits,
        text,
    }
}

/// One line describing how big a holder's bag is.
pub fn ownership_tier(count: u64) -> &'static str {
    match count {
        0 => "No NFTs yet! Start collecting The Medalists.",
        1..=4 => "Getting started! Nice to see your first Medalists.",
        5..=9 => "Nice collection! You are building a solid Medalists portfolio.",
        _ => "You are a whale! Your Medalists collection is impressive.",
    }
}

fn owner_summary(payload: &Value, ctx: &NormalizeContext) -> ChatPayload {
    let total_count = value_as_u64(payload.get("totalCount")).unwrap_or(0);
    let owner = ctx
        .owner
        .clone()
        .or_else(|| payload.get("owner").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_default();

    let nfts: Vec<OwnedNft> = payload
        .get("nfts")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|nft| {
                    let token_id = value_as_id(nft.get("tokenId"))?;
                    let name = nft
                        .get("name")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                        .unwrap_or_else(|| format!("NFT #{}", token_id));
                    Some(OwnedNft {
                        image_url: image_url(nft),
                        traits: Trait::list_from(nft.get("traits")),
                        token_id,
                        name,
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    let text = format!(
        "Medalists collection for {}: {} NFTs. {}",
        short_address(&owner),
        total_count,
        ownership_tier(total_count)
    );

    ChatPayload::OwnerSummary {
        owner,
        total_count,
        network: ctx.collection.network.clone(),
        nfts,
        text,
    }
}

fn top_holders(payload: &Value, ctx: &NormalizeContext) -> ChatPayload {
    let unique_holders = value_as_u64(payload.get("uniqueHolders")).unwrap_or(0);
    let holders: Vec<HolderEntry> = payload
        .get("topHolders")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|holder| {
                    let owner_address = holder.get("ownerAddress")?.as_str()?.to_string();
                    let metadata = holder.get("tokenMetadata").unwrap_or(&Value::Null);
                    Some(HolderEntry {
                        owner_address,
                        balance: value_as_u64(holder.get("balance")).unwrap_or(0),
                        token_id: value_as_id(holder.get("tokenId")).unwrap_or_else(|| "N/A".to_string()),
                        image_url: image_url(metadata),
                        image_data: metadata
                            .get("imageData")
                            .and_then(Value::as_str)
                            .map(str::to_string),
                        traits: Trait::list_from(metadata.get("traits")),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    let text = format!(
        "Top {} holder(s) for the Medalists collection at {}. Unique holders: {}.",
        holders.len(),
        short_address(&ctx.collection.contract_address),
        unique_holders
    );
    ChatPayload::TopHolders {
        unique_holders,
        holders,
        text,
    }
}

fn mint_status(payload: &Value, ctx: &NormalizeContext) -> ChatPayload {
    let status = payload.get("status").cloned().unwrap_or(Value::Null);
    let current_phase = value_as_u64(payload.get("currentPhase")).unwrap_or(0);
    let contract_address = payload
        .get("contractAddress")
        .and_then(Value::as_str)
        .unwrap_or(&ctx.collection.contract_address)
        .to_string();
    let phase_label = if current_phase == 2 { "Public" } else { "Other" };

    let mut text = format!(
        "Mint status for the Medalists collection at {}. Current phase: {}.",
        short_address(&contract_address),
        phase_label
    );
    if let (Some(minted), Some(max)) = (
        value_as_u64(status.get("totalMinted")),
        value_as_u64(status.get("maxSupply")),
    ) {
        text.push_str(&format!(" Total minted: {}/{}.", minted, max));
    }

    ChatPayload::MintStatus {
        contract_address,
        active_phase: payload.get("activePhase").cloned().unwrap_or(Value::Null),
        status,
        current_phase,
        text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx() -> NormalizeContext {
        NormalizeContext {
            collection: CollectionInfo {
                contract_address: "0x387ccF5d1c9928222dD4572dD4e3cd056513e3D6".into(),
                network: "shape-mainnet".into(),
                chain_id: 360,
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_error_wins_over_everything() {
        let payload = json!({"error": true, "message": "rate limited", "totalNfts": 5, "topHolders": []});
        assert_eq!(normalize(&payload, &ctx()), ChatPayload::error("rate limited"));

        // explicit false / null are not errors
        let payload = json!({"error": false, "totalNfts": 5});
        assert!(matches!(normalize(&payload, &ctx()), ChatPayload::CollectionSummary { .. }));
        let payload = json!({"error": null, "message": "hi"});
        assert_eq!(normalize(&payload, &ctx()), ChatPayload::plain("hi"));
    }

    #[test]
    fn test_precedence_order() {
        let both = json!({"status": {}, "currentPhase": 2, "topHolders": []});
        assert!(matches!(normalize(&both, &ctx()), ChatPayload::MintStatus { .. }));

        // status without currentPhase is not a mint status
        let partial = json!({"status": "ok", "topHolders": [], "totalCount": 1});
        assert!(matches!(normalize(&partial, &ctx()), ChatPayload::TopHolders { .. }));

        let owner = json!({"totalCount": 2, "totalNfts": 50});
        assert!(matches!(normalize(&owner, &ctx()), ChatPayload::OwnerSummary { .. }));

        assert_eq!(normalize(&json!({}), &ctx()), ChatPayload::plain("Done."));
    }

    #[test]
    fn test_stats_with_holders_is_collection_summary() {
        let payload = json!({"totalNfts": 50, "holders": 12});
        match normalize(&payload, &ctx()) {
            ChatPayload::CollectionSummary {
                total_supply,
                holders,
                token_id,
                network,
                ..
            } => {
                assert_eq!(total_supply, 50);
                assert_eq!(holders, 12);
                assert_eq!(token_id, None);
                assert_eq!(network, "shape-mainnet");
            }
            other => panic!("unexpected payload: {:?}", other),
        }
    }

    #[test]
    fn test_token_details() {
        let payload = json!({
            "totalNfts": 50,
            "tokenId": "7",
            "nftImageUrl": "https://img/7.png",
            "traits": [{"trait_type": "Background", "value": "Gold"}]
        });
        let ctx = NormalizeContext {
            holders: Some(9),
            ..ctx()
        };
        match normalize(&payload, &ctx) {
            ChatPayload::CollectionSummary {
                token_id,
                traits,
                text,
                image_url,
                holders,
                ..
            } => {
                assert_eq!(token_id.as_deref(), Some("7"));
                assert_eq!(
                    traits,
                    Some(vec![Trait {
                        trait_type: "Background".into(),
                        value: "Gold".into()
                    }])
                );
                assert_eq!(image_url.as_deref(), Some("https://img/7.png"));
                assert_eq!(holders, 9);
                assert!(text.contains("#7"));
                assert!(text.contains("Background: Gold"));
            }
            other => panic!("unexpected payload: {:?}", other),
        }
    }

    #[test]
    fn test_owner_summary_tiers() {
        let ctx = NormalizeContext {
            owner: Some("0xAbC0000000000000000000000000000000000123".into()),
            ..ctx()
        };
        let payload = json!({
            "totalCount": 12,
            "nfts": [{"tokenId": "3", "imageUrl": "https://img/3.png", "traits": []}, {"name": "no id"}]
        });
        match normalize(&payload, &ctx) {
            ChatPayload::OwnerSummary { owner, total_count, nfts, text, .. } => {
                assert_eq!(owner, "0xAbC0000000000000000000000000000000000123");
                assert_eq!(total_count, 12);
                assert_eq!(nfts.len(), 1);
                assert_eq!(nfts[0].name, "NFT #3");
                assert!(text.contains("whale"));
            }
            other => panic!("unexpected payload: {:?}", other),
        }

        assert!(ownership_tier(0).starts_with("No NFTs yet"));
        assert!(ownership_tier(4).starts_with("Getting started"));
        assert!(ownership_tier(5).starts_with("Nice collection"));
        assert!(ownership_tier(10).starts_with("You are a whale"));
    }

    #[test]
    fn test_top_holders_metadata() {
        let payload = json!({
            "uniqueHolders": 40,
            "topHolders": [{
                "ownerAddress": "0xabc",
                "balance": 14,
                "tokenId": "22",
                "tokenMetadata": {"nftImageUrl": "https://img/22.png", "imageData": null, "traits": [{"trait_type": "Sport", "value": "Rowing"}]}
            }]
        });
        match normalize(&payload, &ctx()) {
            ChatPayload::TopHolders { unique_holders, holders, text } => {
                assert_eq!(unique_holders, 40);
                assert_eq!(holders[0].balance, 14);
                assert_eq!(holders[0].image_url.as_deref(), Some("https://img/22.png"));
                assert_eq!(holders[0].image_data, None);
                assert_eq!(holders[0].traits[0].value, "Rowing");
                assert!(text.contains("Unique holders: 40"));
            }
            other => panic!("unexpected payload: {:?}", other),
        }
    }

    #[test]
    fn test_mint_status_text() {
        let payload = json!({
            "contractAddress": "0x387ccF5d1c9928222dD4572dD4e3cd056513e3D6",
            "status": {"totalMinted": 120, "maxSupply": 500},
            "currentPhase": 2,
            "activePhase": {"phaseType": 2}
        });
        match normalize(&payload, &ctx()) {
            ChatPayload::MintStatus { current_phase, text, active_phase, .. } => {
                assert_eq!(current_phase, 2);
                assert_eq!(active_phase, json!({"phaseType": 2}));
                assert!(text.contains("Current phase: Public"));
                assert!(text.contains("Total minted: 120/500"));
            }
            other => panic!("unexpected payload: {:?}", other),
        }

        let other = json!({"status": {}, "currentPhase": 1});
        assert!(normalize(&other, &ctx()).text().contains("Current phase: Other"));
    }
}
