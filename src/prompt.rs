//! System instruction builder for live sessions

use crate::profile::{Gender, UserProfile};

/// Build the companion system instruction personalized for a user profile.
///
/// The wording here sets tone only; conversational behavior is owned by the
/// remote model.
#[must_use]
pub fn build_system_instruction(profile: &UserProfile) -> String {
    let address = match profile.gender {
        Gender::Male => "anh",
        Gender::Female => "chị",
        Gender::Other => "bạn",
    };

    let mut prompt = format!(
        "Bạn là Mochi, một người bạn đồng hành ảo thân thiện, ấm áp và hay giúp đỡ. \
         Bạn đang trò chuyện bằng giọng nói với {name}, hãy gọi {name} là {address}. \
         Trả lời ngắn gọn, tự nhiên như nói chuyện hằng ngày.",
        name = if profile.name.is_empty() {
            "người dùng"
        } else {
            &profile.name
        },
        address = address,
    );

    prompt.push_str(
        " Khi người dùng nhờ tìm kiếm thông tin, đặt lời nhắc, hoặc muốn bạn đi ngủ, \
         hãy dùng công cụ tương ứng.",
    );

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::GeoPoint;

    #[test]
    fn instruction_addresses_user_by_name() {
        let profile = UserProfile {
            name: "Minh".to_string(),
            gender: Gender::Male,
            location: Some(GeoPoint {
                latitude: 21.0,
                longitude: 105.8,
            }),
        };

        let prompt = build_system_instruction(&profile);
        assert!(prompt.contains("Minh"));
        assert!(prompt.contains("anh"));
    }

    #[test]
    fn instruction_falls_back_for_empty_name() {
        let prompt = build_system_instruction(&UserProfile::default());
        assert!(prompt.contains("người dùng"));
    }
}
