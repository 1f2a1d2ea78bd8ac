use route_trace_lib::{navigation_data::NavigationDataPatch, stop::StopId};
use route_trace_session::{
    adapters::Place,
    registry::StopDetails,
    search::AddressSearch,
    AdapterError, OptimizeOutcome, Rejection, SessionRuntime, SessionSnapshot,
};

use crate::repl::{Action, HELP};

/// Executes parsed actions against one session.
pub struct Shell {
    runtime: SessionRuntime,
    search: AddressSearch,
    results: Vec<Place>,
}

impl Shell {
    pub fn new(runtime: SessionRuntime, search: AddressSearch) -> Self {
        Self {
            runtime,
            search,
            results: Vec::new(),
        }
    }

    /// Returns false once the user asked to quit.
    pub async fn execute(&mut self, action: Action) -> bool {
        let runtime = self.runtime.clone();
        let result = match action {
            Action::StartTracing => runtime.start_tracing(),
            Action::Prepare => runtime.enter_preparation(),
            Action::Unprepare => runtime.leave_preparation(),
            Action::SetRouteType(route_type) => runtime.set_route_type(route_type),
            Action::Center(coordinates) => runtime.on_center_changed(coordinates),
            Action::Add { coordinates, name } => {
                runtime.add_stop(coordinates, name, None).await.map(|stop| print_added(&stop.name, stop.address.as_deref()))
            }
            Action::Search(query) => {
                self.search_places(&query).await;
                Ok(())
            }
            Action::Pick(position) => match self.results.get(position - 1).cloned() {
                Some(place) => runtime.add_stop(place.center, Some(place.text), Some(place.place_name))
                    .await
                    .map(|stop| print_added(&stop.name, stop.address.as_deref())),
                None => {
                    println!("No search result {position}");
                    Ok(())
                }
            },
            Action::Remove(position) => match self.stop_id(position) {
                Some(id) => runtime.remove_stop(id),
                None => {
                    println!("No stop {position}");
                    Ok(())
                }
            },
            Action::RemoveLast => runtime.remove_last_stop(),
            Action::Clear => runtime.clear_all_stops(),
            Action::Move { from, to } => runtime.reorder_stop(from - 1, to - 1),
            Action::Rename { position, name } => self.update_details(position, StopDetails { name: Some(name), ..Default::default() }),
            Action::Code { position, code } => self.update_details(position, StopDetails { code: Some(code), ..Default::default() }),
            Action::Note { position, notes } => self.update_details(position, StopDetails { notes: Some(notes), ..Default::default() }),
            Action::ShowConfirmation => runtime.show_trace_confirmation(),
            Action::HideConfirmation => runtime.hide_trace_confirmation(),
            Action::Accept => runtime.confirm_trace(),
            Action::Cancel => runtime.cancel_trace(),
            Action::Go => runtime.start_active_navigation(),
            Action::Halt => runtime.stop_active_navigation(),
            Action::Pause => runtime.pause_navigation(),
            Action::Resume => runtime.resume_navigation(),
            Action::Done => runtime.complete_current_stop(),
            Action::Optimize => runtime.optimize_route().await.map(print_outcome),
            Action::Suggest => {
                match runtime.suggest_optimization().await {
                    Some(outcome) => print_outcome(outcome),
                    None => println!("No optimization needed right now"),
                }
                Ok(())
            }
            Action::Fuel(liters) => runtime.update_navigation_data(NavigationDataPatch {
                actual_fuel_liters: Some(liters),
                ..Default::default()
            }),
            Action::GiveUp => runtime.give_up_navigation(),
            Action::End => runtime.end_route(),
            Action::Save => runtime.save_and_complete_route(),
            Action::Open(dialog) => {
                runtime.open_dialog(dialog);
                Ok(())
            }
            Action::Close(dialog) => {
                runtime.close_dialog(dialog);
                Ok(())
            }
            Action::Status { json } => {
                print_status(&runtime.snapshot(), json);
                Ok(())
            }
            Action::Help => {
                println!("{HELP}");
                Ok(())
            }
            Action::Quit => return false,
        };

        report(result);
        true
    }

    async fn search_places(&mut self, query: &str) {
        match self.search.search(query).await {
            Ok(places) if places.is_empty() => println!("Nothing found for {query:?}"),
            Ok(places) => {
                for (index, place) in places.iter().enumerate() {
                    println!("{:>2}. {}", index + 1, place.place_name);
                }
                self.results = places;
            }
            Err(AdapterError::Aborted) => {}
            Err(err) => {
                tracing::warn!("Search failed: {err}");
                println!("Search is unavailable right now");
            }
        }
    }

    fn stop_id(&self, position: usize) -> Option<StopId> {
        self.runtime.snapshot().stops.get(position - 1).map(|stop| stop.id.clone())
    }

    fn update_details(&self, position: usize, details: StopDetails) -> Result<(), Rejection> {
        match self.stop_id(position) {
            Some(id) => self.runtime.update_stop_details(id, details),
            None => {
                println!("No stop {position}");
                Ok(())
            }
        }
    }
}

fn report(result: Result<(), Rejection>) {
    match result {
        Ok(()) => {}
        Err(rejection @ Rejection::Validation(_)) => {
            if let Some(message) = rejection.user_message() {
                println!("! {message}");
            }
        }
        Err(Rejection::InvalidPhase { command, phase }) => println!("{command} is not available while {phase}"),
        Err(Rejection::Aborted(_)) => {}
    }
}

fn print_added(name: &str, address: Option<&str>) {
    println!("Added {name}: {}", address.unwrap_or("(no address)"));
}

fn print_outcome(outcome: OptimizeOutcome) {
    match outcome {
        OptimizeOutcome::Applied { distance_meters: Some(meters) } => println!("Route optimized, {:.1} km", meters / 1000.0),
        OptimizeOutcome::Applied { distance_meters: None } => println!("Route optimized"),
        OptimizeOutcome::Degraded(_) => println!("Optimization unavailable, keeping the current order"),
        OptimizeOutcome::Aborted(_) => println!("Route changed meanwhile, optimization dropped"),
    }
}

fn print_status(snapshot: &SessionSnapshot, json: bool) {
    if json {
        match serde_json::to_string_pretty(snapshot) {
            Ok(text) => println!("{text}"),
            Err(err) => tracing::error!("Failed to format snapshot: {err}"),
        }
        return;
    }

    println!("Phase: {}  Credits: {}", snapshot.phase, snapshot.estimated_credits);
    for stop in &snapshot.stops {
        let mark = if stop.is_completed { "x" } else { " " };
        let current = snapshot.current_stop().filter(|current| current.id == stop.id).map(|_| ">").unwrap_or(" ");
        println!("{current}[{mark}] {}. {} - {}", stop.order, stop.name, stop.address.as_deref().unwrap_or("resolving..."));
    }

    if snapshot.is_navigating() {
        let data = &snapshot.navigation_data;
        println!(
            "Progress {:.0}%  remaining {:.1} km of {:.1} km  fuel {:.2} L est. / {:.2} L  active {}s",
            snapshot.progress_percent(),
            data.remaining_distance_meters / 1000.0,
            data.total_distance_meters / 1000.0,
            data.estimated_fuel_liters,
            data.actual_fuel_liters,
            data.active_time_millis / 1000,
        );
    }
}
