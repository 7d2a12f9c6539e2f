//! Bonjour Santé portal flow.
//!
//! The clinic search and booking UI lives inside a hub iframe; every
//! interaction past the landing page is frame-scoped. This is the one
//! portal with self-service booking, so it carries the booking completer.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Local;
use portal_flow::{
    BookingCompleter, BookingResult, BranchDecision, BrowserSession, MarkerSet, PatientProfile,
    PortalError, Probe, Result, Selector, Settle,
};
use rand::Rng;
use tracing::info;

const CLINIC_URL: &str = "https://bonjour-sante.ca/uno/clinique";
const HUB_IFRAME: &str = "iframe[src*='hub.bonjour-sante.ca']";

const ACCEPT_COOKIES: &str = "#didomi-notice-agree-button";
const POSTAL_CATEGORY: &str = "div[data-test='postalCodeCategoryButton']";
const LANDING_NAM: &str = "#patient-nam-input";
const POSTAL_SEARCH: &str = "#postal-code-search-input";
const POSTAL_SEARCH_BUTTON: &str = "button[data-test='searchPostalCodeButton']";

const HUB_NAM: &str = "input#healthInsuranceNumber";
const HUB_NAM_SEQUENCE: &str = "input#healthInsuranceNumberSequence";
const HUB_FIRST_NAME: &str = "input#firstName";
const HUB_LAST_NAME: &str = "input#lastName";
const CONFIRM: &str = "button#confirm";
const CONTINUE: &str = "button#continue";

const WALKIN_RADIO: &str = "mat-radio-button#mat-radio-2";
const DATE_INPUT: &str = "#mat-input-0";
const RADIUS_SLIDER: &str = "input[type='range']";

const RESULTS_HEADER: &str = "div.title-criteria-container";
const RESULT_LABEL: &str = "span.label-message";
const NO_SLOT_TEXT: &str = "Aucun rendez-vous ne correspond à vos critères de recherche";
const LOCKED_WALKIN: &str = "app-locked-walkin-availability[data-test='locked-walkin-availability']";
const RESERVED_TEXT: &str = "Consultation réservée pour vous";
const ERROR_BANNER: &str = "div.t-alert-content";
const ERROR_BACK_LINK: &str = "a.link";
const NEW_SEARCH: &str = "[data-test='make-new-search']";

const BOOK_CONFIRM_SELECTION: &str = "button[data-test='confirm-selection-button']";
const BOOK_TERMS_CHECKBOX: &str = "#confirmation-checkbox-input";
const BOOK_PHONE: &str = "input#cellPhone";
const BOOK_EMAIL: &str = "input#email";
const BOOK_REASONS: &str = "select#reasons";
/// "Autres" in the consultation-reason select.
const REASON_OTHER: &str = "28";
const BOOK_DIALOG_CONFIRM: &str = "#confirm";
const BOOK_SUBMIT: &str = "button[data-test='registration-dialog-submit-btn']";
const BOOK_CONFIRMED_ALERT: &str = "lib-alert";

fn hub(selector: Selector) -> Selector {
    Selector::in_frame(HUB_IFRAME, selector)
}

/// Normalize a bare 10-digit number into the `(nnn) nnn-nnnn` format the
/// registration form expects.
pub fn format_phone_number(number: &str) -> Result<String> {
    if number.len() == 10 && number.chars().all(|c| c.is_ascii_digit()) {
        Ok(format!(
            "({}) {}-{}",
            &number[..3],
            &number[3..6],
            &number[6..]
        ))
    } else {
        Err(PortalError::InvalidProfile(
            "cellphone must be 10 digits".to_string(),
        ))
    }
}

pub struct BonjourSanteFlow {
    markers: MarkerSet,
    /// Pause between the criteria confirm and continue clicks when
    /// re-entering the search, so re-polls do not hammer the hub.
    recovery_pause: (Duration, Duration),
    completer: BonjourSanteBooking,
}

impl BonjourSanteFlow {
    pub fn new() -> Self {
        Self {
            markers: MarkerSet {
                no_slot: vec![Probe::TextContains {
                    scope: hub(Selector::css(RESULT_LABEL)),
                    needle: NO_SLOT_TEXT.into(),
                }],
                slot_found: vec![
                    Probe::Present(hub(Selector::css(LOCKED_WALKIN))),
                    Probe::TextContains {
                        scope: hub(Selector::css("body")),
                        needle: RESERVED_TEXT.into(),
                    },
                ],
                error_banner: vec![Probe::Present(hub(Selector::css(ERROR_BANNER)))],
            },
            recovery_pause: (Duration::from_secs(2), Duration::from_secs(10)),
            completer: BonjourSanteBooking,
        }
    }

    pub fn with_recovery_pause(mut self, min: Duration, max: Duration) -> Self {
        self.recovery_pause = (min, max);
        self
    }

    async fn pause_before_continue(&self) {
        let (min, max) = self.recovery_pause;
        let millis = if max > min {
            rand::rng().random_range(min.as_millis() as u64..=max.as_millis() as u64)
        } else {
            min.as_millis() as u64
        };
        tokio::time::sleep(Duration::from_millis(millis)).await;
    }

    /// Confirm the criteria form and continue to the results, with the
    /// anti-hammering pause in between.
    async fn reenter_search(&self, session: &dyn BrowserSession) -> Result<()> {
        session.click(&hub(Selector::css(CONFIRM))).await?;
        self.pause_before_continue().await;
        session.click(&hub(Selector::css(CONTINUE))).await
    }
}

impl Default for BonjourSanteFlow {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl portal_flow::PortalFlow for BonjourSanteFlow {
    fn name(&self) -> &str {
        "bonjour_sante"
    }

    fn markers(&self) -> &MarkerSet {
        &self.markers
    }

    async fn setup(&self, session: &dyn BrowserSession, profile: &PatientProfile) -> Result<()> {
        info!("navigating to clinic search");
        session.goto(CLINIC_URL, Settle::Load).await?;
        session.click(&Selector::css(ACCEPT_COOKIES)).await?;
        session.click(&Selector::css(POSTAL_CATEGORY)).await?;

        // The landing form takes the card sequence number here; the full
        // NAM goes into the hub form below.
        session
            .fill(&Selector::css(LANDING_NAM), &profile.card_seq_number)
            .await?;
        session
            .fill(&Selector::css(POSTAL_SEARCH), &profile.postal_code)
            .await?;
        session
            .click(&Selector::css(POSTAL_SEARCH_BUTTON))
            .await?;

        session
            .wait_visible(&Selector::css(HUB_IFRAME), Duration::from_secs(60))
            .await?;

        info!("filling hub identity form");
        session
            .fill(&hub(Selector::css(HUB_NAM)), &profile.nam_compact())
            .await?;
        session
            .fill(
                &hub(Selector::css(HUB_NAM_SEQUENCE)),
                &profile.card_seq_number,
            )
            .await?;
        session
            .fill(&hub(Selector::css(HUB_FIRST_NAME)), &profile.first_name)
            .await?;
        session
            .fill(&hub(Selector::css(HUB_LAST_NAME)), &profile.last_name)
            .await?;
        session.click(&hub(Selector::css(CONFIRM))).await?;
        Ok(())
    }

    async fn resolve_branch(&self, _session: &dyn BrowserSession) -> Result<BranchDecision> {
        // Bonjour Santé has no family-physician fork.
        Ok(BranchDecision::NotApplicable)
    }

    async fn configure_search(
        &self,
        session: &dyn BrowserSession,
        _profile: &PatientProfile,
        _branch: BranchDecision,
    ) -> Result<()> {
        session
            .wait_visible(&Selector::css(HUB_IFRAME), Duration::from_secs(60))
            .await?;

        info!("configuring search criteria");
        session.click(&hub(Selector::css(WALKIN_RADIO))).await?;

        let today = Local::now().format("%Y-%m-%d").to_string();
        session
            .fill(&hub(Selector::css(DATE_INPUT)), &today)
            .await?;

        // The radius slider ignores plain input; drive it from a script
        // and fire the events the framework listens for. Value 2 is 50 km.
        let slider = hub(Selector::css(RADIUS_SLIDER));
        session.eval(&slider, "arguments[0].value = '2';").await?;
        session
            .eval(&slider, "arguments[0].dispatchEvent(new Event('input'));")
            .await?;
        session
            .eval(&slider, "arguments[0].dispatchEvent(new Event('change'));")
            .await?;

        session.click(&hub(Selector::css(CONFIRM))).await?;
        session.click(&hub(Selector::css(CONTINUE))).await?;
        Ok(())
    }

    async fn submit_search(
        &self,
        session: &dyn BrowserSession,
        _profile: &PatientProfile,
    ) -> Result<()> {
        // The hub pushes results into the frame; polling just waits for
        // the results header to render.
        session
            .wait_visible(&hub(Selector::css(RESULTS_HEADER)), Duration::from_secs(60))
            .await
    }

    async fn acknowledge_no_slot(&self, session: &dyn BrowserSession) -> Result<()> {
        session.click(&hub(Selector::css(NEW_SEARCH))).await?;
        self.reenter_search(session).await
    }

    async fn dismiss_error(&self, session: &dyn BrowserSession) -> Result<()> {
        session.click(&hub(Selector::css(ERROR_BACK_LINK))).await?;
        self.reenter_search(session).await
    }

    fn booking(&self) -> Option<&dyn BookingCompleter> {
        Some(&self.completer)
    }
}

/// Confirm-and-register sequence from a SlotFound position. No retries:
/// the slot is presumed lost on any failure.
pub struct BonjourSanteBooking;

#[async_trait]
impl BookingCompleter for BonjourSanteBooking {
    async fn complete(
        &self,
        session: &dyn BrowserSession,
        profile: &PatientProfile,
    ) -> Result<BookingResult> {
        info!("confirming slot selection");
        session
            .click(&hub(Selector::css(BOOK_CONFIRM_SELECTION)))
            .await?;
        session
            .wait_visible(
                &hub(Selector::css(BOOK_TERMS_CHECKBOX)),
                Duration::from_secs(60),
            )
            .await?;

        session
            .fill(
                &hub(Selector::css(BOOK_PHONE)),
                &format_phone_number(&profile.cellphone)?,
            )
            .await?;
        session
            .fill(&hub(Selector::css(BOOK_EMAIL)), &profile.email)
            .await?;
        session
            .select_value(&hub(Selector::css(BOOK_REASONS)), REASON_OTHER)
            .await?;
        session
            .set_checked(&hub(Selector::css(BOOK_TERMS_CHECKBOX)))
            .await?;
        session
            .click(&hub(Selector::css(BOOK_DIALOG_CONFIRM)))
            .await?;
        session.click(&hub(Selector::css(BOOK_SUBMIT))).await?;

        match session
            .wait_visible(
                &hub(Selector::css(BOOK_CONFIRMED_ALERT)),
                Duration::from_secs(60),
            )
            .await
        {
            Ok(()) => {
                info!("booking confirmed");
                Ok(BookingResult::Confirmed)
            }
            Err(PortalError::Timeout(_)) => Ok(BookingResult::TimedOut),
            Err(other) => Err(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portals::testutil::{RecordingSession, op_index};
    use portal_flow::{Outcome, PortalFlow, classify};

    fn profile() -> PatientProfile {
        PatientProfile {
            first_name: "Marie".into(),
            last_name: "Tremblay".into(),
            nam: "TREM 1234 5678".into(),
            card_seq_number: "01".into(),
            postal_code: "H2X1Y4".into(),
            birth_day: "07".into(),
            birth_month: "3".into(),
            birth_year: "1988".into(),
            cellphone: "5145551234".into(),
            email: "marie@example.com".into(),
        }
    }

    fn fast_flow() -> BonjourSanteFlow {
        BonjourSanteFlow::new()
            .with_recovery_pause(Duration::from_millis(1), Duration::from_millis(2))
    }

    #[test]
    fn phone_number_formatting() {
        assert_eq!(
            format_phone_number("5145551234").unwrap(),
            "(514) 555-1234"
        );
        assert!(format_phone_number("514555123").is_err());
        assert!(format_phone_number("514555123a").is_err());
        assert!(format_phone_number("(514) 555-1234").is_err());
    }

    #[tokio::test]
    async fn setup_fills_the_hub_form_with_a_compact_nam() {
        let session = RecordingSession::new();
        fast_flow().setup(&session, &profile()).await.unwrap();

        let ops = session.ops();
        let landing = op_index(&ops, "fill #patient-nam-input=01");
        let hub_nam = op_index(&ops, "input#healthInsuranceNumber=TREM12345678");
        let confirm = op_index(&ops, "click iframe[src*='hub.bonjour-sante.ca'] >> button#confirm");
        assert!(landing < hub_nam);
        assert!(hub_nam < confirm);
    }

    #[tokio::test]
    async fn criteria_step_drives_the_slider_from_script() {
        let session = RecordingSession::new();
        fast_flow()
            .configure_search(&session, &profile(), BranchDecision::NotApplicable)
            .await
            .unwrap();

        let ops = session.ops();
        let set = op_index(&ops, "arguments[0].value = '2';");
        let input_event = op_index(&ops, "new Event('input')");
        let change_event = op_index(&ops, "new Event('change')");
        let cont = op_index(&ops, "button#continue");
        assert!(set < input_event);
        assert!(input_event < change_event);
        assert!(change_event < cont);
    }

    #[tokio::test]
    async fn no_slot_reenters_the_criteria_step() {
        let session = RecordingSession::new();
        fast_flow().acknowledge_no_slot(&session).await.unwrap();

        let ops = session.ops();
        let modify = op_index(&ops, "[data-test='make-new-search']");
        let confirm = op_index(&ops, "button#confirm");
        let cont = op_index(&ops, "button#continue");
        assert!(modify < confirm);
        assert!(confirm < cont);
    }

    #[tokio::test]
    async fn error_banner_is_dismissed_with_the_sites_own_controls() {
        let session = RecordingSession::new();
        fast_flow().dismiss_error(&session).await.unwrap();

        let ops = session.ops();
        let back = op_index(&ops, "a.link");
        let cont = op_index(&ops, "button#continue");
        assert!(back < cont);
    }

    #[tokio::test]
    async fn markers_cover_both_slot_found_shapes() {
        let flow = fast_flow();

        let session = RecordingSession::new();
        session.show(&format!("{HUB_IFRAME} >> {LOCKED_WALKIN}"));
        assert_eq!(
            classify(&session, flow.markers()).await.unwrap(),
            Outcome::SlotFound
        );

        let session = RecordingSession::new();
        session.set_text(
            &format!("{HUB_IFRAME} >> body"),
            "… Consultation réservée pour vous …",
        );
        assert_eq!(
            classify(&session, flow.markers()).await.unwrap(),
            Outcome::SlotFound
        );

        let session = RecordingSession::new();
        session.set_text(
            &format!("{HUB_IFRAME} >> {RESULT_LABEL}"),
            "Aucun rendez-vous ne correspond à vos critères de recherche",
        );
        assert_eq!(
            classify(&session, flow.markers()).await.unwrap(),
            Outcome::NoSlotAvailable
        );

        let session = RecordingSession::new();
        session.show(&format!("{HUB_IFRAME} >> {ERROR_BANNER}"));
        assert_eq!(
            classify(&session, flow.markers()).await.unwrap(),
            Outcome::TransientError
        );
    }

    #[tokio::test]
    async fn booking_walks_the_registration_sequence() {
        let session = RecordingSession::new();
        let result = BonjourSanteBooking
            .complete(&session, &profile())
            .await
            .unwrap();
        assert_eq!(result, BookingResult::Confirmed);

        let ops = session.ops();
        let select = op_index(&ops, "confirm-selection-button");
        let phone = op_index(&ops, "input#cellPhone=(514) 555-1234");
        let reason = op_index(&ops, "select#reasons=28");
        let terms = op_index(&ops, "check iframe[src*='hub.bonjour-sante.ca'] >> #confirmation-checkbox-input");
        let submit = op_index(&ops, "registration-dialog-submit-btn");
        let confirmed = op_index(&ops, "wait iframe[src*='hub.bonjour-sante.ca'] >> lib-alert");
        assert!(select < phone);
        assert!(phone < reason);
        assert!(reason < terms);
        assert!(terms < submit);
        assert!(submit < confirmed);
    }

    #[tokio::test]
    async fn booking_times_out_when_the_confirmation_never_renders() {
        let session = RecordingSession::new();
        session.time_out_on(&format!("{HUB_IFRAME} >> {BOOK_CONFIRMED_ALERT}"));
        let result = BonjourSanteBooking
            .complete(&session, &profile())
            .await
            .unwrap();
        assert_eq!(result, BookingResult::TimedOut);
    }
}
