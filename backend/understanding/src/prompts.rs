//! Prompt text for each analysis stage.

use roomscribe_core::{ModelRequest, Stage};

const ROOM_SYSTEM: &str = "You are a professional real estate photographer reviewing listing \
photos. Identify the room or area shown as precisely as possible (e.g., Kitchen, Living Room, \
Primary Bedroom, Backyard, Front Exterior). Base the answer on visible elements only.

Format your response exactly as:
Room/Area: [room type]";

const ROOM_USER: &str = "Identify the room or area in this real estate photo.";

const CAPTION_SYSTEM: &str = "You are a real estate caption writer. Create a caption that:
1. Is between {min} and {max} characters long
2. Includes the room type
3. Focuses on the most striking visible feature
4. Uses neutral, descriptive language
5. Avoids promotional terms like \"amazing\" or \"best\"

Example format:
\"Modern Kitchen with Marble Island\"
\"Bright Living Room with Floor-to-Ceiling Windows\"

Reply with the caption only.";

pub fn room_identification(image_url: &str) -> ModelRequest {
    ModelRequest::new(ROOM_SYSTEM, ROOM_USER)
        .for_stage(Stage::RoomId)
        .with_image(image_url)
}

pub fn detailed_description(image_url: &str, room: &str) -> ModelRequest {
    let system = format!(
        "You are a professional real estate photographer describing a photo of a {room}. \
Write a neutral, specific visual description of about 200 characters covering the key features, \
materials, fixtures and layout typical buyers look for in a {room}. Avoid subjective terms like \
\"amazing\" or \"best\" and describe visible elements only, no assumptions.

Format your response exactly as:
Visual Description: [description]"
    );
    let user = format!("Describe the visible features of this {room}.");
    ModelRequest::new(system, user)
        .for_stage(Stage::DetailedDescription)
        .with_image(image_url)
}

pub fn caption_synthesis(
    room: &str,
    description: &str,
    min_chars: usize,
    max_chars: usize,
) -> ModelRequest {
    let system = CAPTION_SYSTEM
        .replace("{min}", &min_chars.to_string())
        .replace("{max}", &max_chars.to_string());
    let user = format!(
        "Create a {min_chars}-{max_chars} character caption for this {room} \
         with these features: \"{description}\""
    );
    ModelRequest::new(system, user).for_stage(Stage::CaptionSynthesis)
}
