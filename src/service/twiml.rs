//! TwiML document builders for the voice flow
//!
//! TwiML is the XML dialect the telephony provider executes against a live
//! call. Every IVR handler answers with one of these documents.

const VOICE: &str = "Polly.Aditi";
const LANGUAGE: &str = "hi-IN";

/// Initial greeting plus the first recording prompt
pub fn greeting(record_secs: u32) -> String {
    let say = "Namaste. Aap Maitri se baat kar rahe hain. Main aapki madad karne ke liye \
               yahan hoon. Kripaya mujhe apni samasya batayen.";
    format!(
        "{}{}{}</Response>",
        header(),
        say_block(say),
        record_block("/ivr/process-audio", record_secs)
    )
}

/// Speak advice, then invite a follow-up question
pub fn advice(advice_text: &str, record_secs: u32) -> String {
    let followup = "Kya aapka koi aur sawal hai? Agar nahi toh \"alvida\" kahiye.";
    format!(
        "{}{}{}{}</Response>",
        header(),
        say_block(advice_text),
        say_block(followup),
        record_block("/ivr/continue-conversation", record_secs)
    )
}

/// Graceful goodbye and hangup
pub fn goodbye() -> String {
    let say = "Dhanyavaad. Apna khayal rakhein. Alvida.";
    format!("{}{}<Hangup/>\n</Response>", header(), say_block(say))
}

/// Emergency path: ask for the caller's village name
pub fn village_request(record_secs: u32) -> String {
    let say = "Main aapki sthiti ke baare mein chintit hoon. Aapki behtar madad ke liye, \
               kripaya apne gaon ka naam batayen.";
    format!(
        "{}{}{}</Response>",
        header(),
        say_block(say),
        record_block("/ivr/break-glass-confirm", record_secs)
    )
}

/// Confirmation after the village name is captured
pub fn emergency_confirmation() -> String {
    let say = "Dhanyavaad. Main aapki jaankari aapke ASHA karyakarta ko bhej rahi hoon. \
               Ve jaldi hi aapse sampark karenge. Kripaya shant rahein.";
    format!("{}{}<Hangup/>\n</Response>", header(), say_block(say))
}

/// Spoken when the caller has used up all follow-up turns
pub fn turn_limit_reached() -> String {
    let say = "Aapne bahut saare sawal pooche hain. Agar aur madad chahiye toh ASHA \
               karyakarta se miliye. Dhanyavaad.";
    format!("{}{}<Hangup/>\n</Response>", header(), say_block(say))
}

/// Apology used whenever a handler fails. The caller must never hear a
/// bare HTTP error.
pub fn fallback() -> String {
    let say = "Maaf kijiye, main aapko sunne mein samasya ka samna kar rahi hoon. \
               Kripaya apne ASHA karyakarta se turant sampark karein.";
    format!("{}{}<Hangup/>\n</Response>", header(), say_block(say))
}

fn header() -> &'static str {
    "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<Response>\n"
}

fn say_block(text: &str) -> String {
    format!(
        "  <Say voice=\"{}\" language=\"{}\">{}</Say>\n",
        VOICE,
        LANGUAGE,
        escape_xml(text)
    )
}

fn record_block(action: &str, max_length_secs: u32) -> String {
    format!(
        "  <Record action=\"{}\" method=\"POST\" maxLength=\"{}\" timeout=\"5\" transcribe=\"false\"/>\n",
        action, max_length_secs
    )
}

/// Escape text interpolated into TwiML so caller-derived content cannot
/// inject verbs
fn escape_xml(unsafe_text: &str) -> String {
    unsafe_text
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn greeting_records_to_process_audio() {
        let xml = greeting(60);
        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains("action=\"/ivr/process-audio\""));
        assert!(xml.contains("maxLength=\"60\""));
        assert!(xml.contains("Polly.Aditi"));
        assert!(xml.contains("hi-IN"));
    }

    #[test]
    fn advice_escapes_model_output() {
        let xml = advice("aaram karein <b>&</b>", 30);
        assert!(xml.contains("aaram karein &lt;b&gt;&amp;&lt;/b&gt;"));
        assert!(!xml.contains("<b>"));
        assert!(xml.contains("action=\"/ivr/continue-conversation\""));
    }

    #[test]
    fn terminal_documents_hang_up() {
        for xml in [
            goodbye(),
            emergency_confirmation(),
            turn_limit_reached(),
            fallback(),
        ] {
            assert!(xml.contains("<Hangup/>"));
            assert!(!xml.contains("<Record"));
        }
    }

    #[test]
    fn village_request_records_to_break_glass() {
        let xml = village_request(10);
        assert!(xml.contains("action=\"/ivr/break-glass-confirm\""));
        assert!(xml.contains("maxLength=\"10\""));
    }
}
