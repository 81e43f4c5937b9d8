// Integration tests for share-link encoding and decoding

#[cfg(test)]
mod tests {
    use comeback_calc::engine::chart::{build_chart_spec, ChartOptions};
    use comeback_calc::engine::filter::{GameFilterCriteria, TeamLocation, TeamSet};
    use comeback_calc::state::{
        decode, encode, has_state, CalculatorConfiguration, PlotType, YearGroup,
    };

    fn shared_view() -> CalculatorConfiguration {
        CalculatorConfiguration {
            plot_type: PlotType::MaxPointsDown,
            start_time_seconds: 36 * 60,
            year_groups: vec![
                YearGroup::new(2018, 2020, true, false),
                YearGroup::new(2010, 2012, false, true),
            ],
            game_filters: vec![
                None,
                Some(GameFilterCriteria {
                    team_location: Some(TeamLocation::Home),
                    home_top_n: Some(10),
                    vs_team: Some(TeamSet::one("BOS")),
                    ..Default::default()
                }),
                Some(GameFilterCriteria {
                    team_location: Some(TeamLocation::Away),
                    for_team: Some(TeamSet::many(["GSW", "LAL"])),
                    ..Default::default()
                }),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_shared_view_round_trips() {
        let config = shared_view();
        let query = encode(&config);
        assert_eq!(
            query,
            "p=2-36&s=2018-2020-R~2010-2012-P&g=all~H-R:top10-T:BOS~A-T:GSW_LAL-any"
        );
        assert!(has_state(&query));
        assert_eq!(decode(&query), config);
    }

    #[test]
    fn test_decode_encode_is_stable() {
        let queries = [
            "p=0-12-25_5-10&s=1996-1999-B&g=N-R:bot5-R:top5",
            "?p=3-6&g=A-T:NYK-R:mid10",
            "p=7-99-x&s=2040-2050-Q&g=Z-1",
            "pt=1&st=40&gf=%5Bnull%5D",
            "",
        ];
        for query in queries {
            let once = decode(query);
            let twice = decode(&encode(&once));
            assert_eq!(once, twice, "unstable for {query:?}");
        }
    }

    #[test]
    fn test_malformed_links_still_decode() {
        let config = decode("p=abc&s=~~&g=~");
        let defaults = CalculatorConfiguration::default();
        assert_eq!(config.plot_type, defaults.plot_type);
        assert_eq!(config.year_groups, vec![YearGroup::default()]);
        assert_eq!(config.game_filters, vec![None]);
    }

    #[test]
    fn test_points_down_at_time_keeps_its_clock() {
        let config = decode("p=3-5&s=2019-2019-B");
        assert_eq!(config.plot_type, PlotType::PointsDownAtTime);
        assert_eq!(config.specific_time_seconds, Some(300));
        assert_eq!(encode(&config), "p=3-5&s=2019-2019-B&g=all");
    }

    #[test]
    fn test_points_down_at_time_round_trips_specific_time() {
        let config = CalculatorConfiguration {
            plot_type: PlotType::PointsDownAtTime,
            specific_time_seconds: Some(360),
            ..Default::default()
        };
        let decoded = decode(&encode(&config));
        assert_eq!(decoded.specific_time_seconds, Some(360));

        let options = ChartOptions::default();
        let before = build_chart_spec(&config, &options).unwrap();
        let after = build_chart_spec(&decoded, &options).unwrap();
        assert_eq!(after.title, "Win % When Down X Points with 06:00 Left");
        assert_eq!(before.title, after.title);
        assert_eq!(before.time, after.time);
    }
}
